use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use rpkmtools_core::models::Feature;
use rpkmtools_counting::{CountConfig, CountEngine, Report, RunMode};
use rpkmtools_io::{BamSource, Bed6, CatalogError, FeatureCatalog, GeneModel, RepeatMasker};

// not every subcommand defines every argument
fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

///
/// Merge the optional `--config` file with the command line flags.
///
pub fn build_config(matches: &ArgMatches) -> Result<CountConfig> {
    let mut config = match string_arg(matches, "config") {
        Some(path) => CountConfig::try_from(Path::new(&path))
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => CountConfig::default(),
    };

    if flag(matches, "nostrand") {
        config.stranded = false;
    }
    if flag(matches, "coverage") {
        config.coverage = true;
    }
    if flag(matches, "uniq") {
        config.uniq = true;
    }
    if flag(matches, "quiet") {
        config.progress = false;
    }
    if let Some(multiple) = string_arg(matches, "multiple") {
        config.multiple = multiple;
    }
    if let Some(norm) = string_arg(matches, "norm") {
        config.normalization = norm;
    }
    if let Some(tag) = string_arg(matches, "tag") {
        config.multiplicity_tag = tag;
    }
    if let Some(whitelist) = string_arg(matches, "whitelist") {
        config.whitelist = Some(PathBuf::from(whitelist));
    }
    if let Some(blacklist) = string_arg(matches, "blacklist") {
        config.blacklist = Some(PathBuf::from(blacklist));
    }
    if let Ok(Some(threads)) = matches.try_get_one::<usize>("threads") {
        config.threads = *threads;
    }

    Ok(config)
}

fn load_features(mode: RunMode, path: &Path) -> std::result::Result<Vec<Feature>, CatalogError> {
    match mode {
        RunMode::Rpkm | RunMode::Alt => GeneModel::from_path(path),
        RunMode::Bed => Bed6::from_path(path),
        RunMode::Repeat => RepeatMasker::from_path(path),
    }
}

fn write_report(report: &Report, output: Option<&String>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            let mut writer = BufWriter::new(file);
            report.write_to(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            report.write_to(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn run_quant(mode: RunMode, matches: &ArgMatches) -> Result<()> {
    // everything the user typed is checked before any file is read
    let config = build_config(matches)?;
    let options = config.validate(mode)?;

    let annotation = matches
        .get_one::<String>("annotation")
        .context("An annotation file is required.")?;
    let bam = matches
        .get_one::<String>("bam")
        .context("A path to an indexed BAM file is required.")?;

    let features = load_features(mode, Path::new(annotation))
        .with_context(|| format!("Failed to read annotation: {}", annotation))?;
    info!("Loaded {} features from {}", features.len(), annotation);

    let source = BamSource::new(bam, &options.multiplicity_tag)
        .with_context(|| format!("Failed to open alignments: {}", bam))?;

    let report = CountEngine::new(&source, &options).run(&features)?;
    write_report(&report, matches.get_one::<String>("output"))?;

    Ok(())
}
