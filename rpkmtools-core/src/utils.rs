use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use fxhash::FxHashSet;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    let reader = BufReader::new(file);

    Ok(reader)
}

///
/// Read a list of read names, one per line, into a set.
///
/// Surrounding whitespace is trimmed and blank lines are ignored.
///
pub fn read_name_list<P: AsRef<Path>>(path: P) -> Result<FxHashSet<String>> {
    let path = path.as_ref();
    let reader = get_dynamic_reader(path)?;

    let mut names = FxHashSet::default();
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed reading read names from {:?}", path))?;
        let name = line.trim();
        if !name.is_empty() {
            names.insert(name.to_string());
        }
    }

    Ok(names)
}
