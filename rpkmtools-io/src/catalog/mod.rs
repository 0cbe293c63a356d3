//! Annotation readers producing ordered [`Feature`] lists.
//!
//! Every reader implements [`FeatureCatalog`]: parse from any buffered reader,
//! or from a path (gzip-compressed files are detected by their `.gz` extension).

pub mod bed;
pub mod gene_model;
pub mod repeatmasker;

use std::io::BufRead;
use std::path::Path;

use rpkmtools_core::models::Feature;
use rpkmtools_core::utils::get_dynamic_reader;

use crate::error::{CatalogError, Result};

pub use self::bed::Bed6;
pub use self::gene_model::GeneModel;
pub use self::repeatmasker::RepeatMasker;

pub trait FeatureCatalog {
    /// Parse all features, in file order.
    fn parse<R: BufRead>(reader: R) -> Result<Vec<Feature>>;

    fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Feature>> {
        let reader = get_dynamic_reader(path.as_ref())
            .map_err(|e| CatalogError::FileReadError(format!("{:#}", e)))?;
        Self::parse(reader)
    }
}

/// Split a line into at least `expected` columns, reporting 1-based line numbers.
pub(crate) fn split_columns<'a>(
    fields: impl Iterator<Item = &'a str>,
    expected: usize,
    line: usize,
) -> Result<Vec<&'a str>> {
    let cols: Vec<&str> = fields.collect();
    if cols.len() < expected {
        return Err(CatalogError::MissingColumns {
            line,
            expected,
            found: cols.len(),
        });
    }
    Ok(cols)
}

pub(crate) fn parse_coord(value: &str, what: &str, line: usize) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| CatalogError::ParseError {
        line,
        message: format!("invalid {}: {:?}", what, value),
    })
}
