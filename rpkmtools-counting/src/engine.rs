//! Runs one counting mode over a feature catalog.
//!
//! Features are counted in parallel on a dedicated rayon pool, each worker
//! holding its own alignment store handle. Results come back in catalog order.
//! A full-store scan for total-mapped normalization runs alongside feature
//! counting on its own handle.

use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use rpkmtools_core::errors::StoreError;
use rpkmtools_core::models::{Feature, FeatureKind, Strand};
use rpkmtools_core::store::{AlignmentStore, StoreSource};

use crate::blocks::{AltSpliceProfile, alt_splice_profile};
use crate::config::{CountOptions, NormalizationMode, RunMode};
use crate::counter::{CountResult, NameFilter, OverlapCounter};
use crate::coverage::{self, CoverageStats};
use crate::errors::{CountError, Result};
use crate::normalization::{NormalizationContext, rpkm, total_mapped};
use crate::report::{Field, Report, ReportHeader, ReportSchema};

/// Count and optional coverage of one feature.
#[derive(Debug, Clone)]
pub struct FeatureCount {
    pub result: CountResult,
    pub coverage: Option<CoverageStats>,
}

pub struct CountEngine<'a, S: StoreSource> {
    source: &'a S,
    options: &'a CountOptions,
}

impl<'a, S: StoreSource> CountEngine<'a, S> {
    pub fn new(source: &'a S, options: &'a CountOptions) -> Self {
        CountEngine { source, options }
    }

    ///
    /// Count every feature and assemble the report for the configured mode.
    ///
    pub fn run(&self, features: &[Feature]) -> Result<Report> {
        // fail with the store's own error before any worker starts
        drop(self.source.open()?);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|e| CountError::ThreadPool(e.to_string()))?;

        info!(
            "Counting {} features in {} mode using {} threads",
            features.len(),
            self.options.mode,
            self.options.threads
        );

        pool.install(|| match self.options.mode {
            RunMode::Rpkm => self.run_genes(features),
            RunMode::Bed => self.run_bed(features),
            RunMode::Repeat => self.run_repeats(features),
            RunMode::Alt => self.run_alt(features),
        })
    }

    fn strand_filter(&self, feature: &Feature) -> Option<Strand> {
        if self.options.stranded {
            Some(feature.strand)
        } else {
            None
        }
    }

    fn progress_bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(message);
        pb
    }

    fn spinner(&self) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} reads)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Scanning alignments for mapped reads");
        pb
    }

    ///
    /// Apply `f` to every feature whose reference the store knows, in parallel.
    /// Features on unknown references map to `None`.
    ///
    fn map_features<T, F>(&self, features: &[Feature], message: &'static str, f: F) -> Result<Vec<Option<T>>>
    where
        T: Send,
        F: Fn(&mut S::Store, &Feature) -> Result<T> + Sync + Send,
    {
        let pb = self.progress_bar(features.len(), message);

        let results = features
            .par_iter()
            .map_init(
                || self.source.open(),
                |store, feature| {
                    let out = match store {
                        Ok(store) if !store.has_reference(&feature.reference) => {
                            debug!(
                                "Skipping {}: reference {} not in alignments",
                                feature.name(),
                                feature.reference
                            );
                            Ok(None)
                        }
                        Ok(store) => f(store, feature).map(Some),
                        Err(e) => Err(CountError::Store(std::mem::replace(
                            e,
                            StoreError::OpenError("worker store handle failed earlier".to_string()),
                        ))),
                    };
                    pb.inc(1);
                    out
                },
            )
            .collect::<Result<Vec<Option<T>>>>();

        pb.finish_and_clear();
        results
    }

    fn count_feature(&self, store: &mut S::Store, feature: &Feature) -> Result<FeatureCount> {
        let strand = self.strand_filter(feature);
        let spans = feature.spans();

        let result = OverlapCounter::from_options(self.options)
            .with_strand(strand)
            .count(store, &feature.reference, &spans)?;

        let coverage = if self.options.coverage {
            let names = NameFilter::from_options(self.options);
            let stats = coverage::summarize(store, &feature.reference, &spans, strand, &names)?;
            if !stats.is_defined() {
                warn!(
                    "Coverage is undefined for {} (fewer than 2 bases)",
                    feature.name()
                );
            }
            Some(stats)
        } else {
            None
        };

        Ok(FeatureCount { result, coverage })
    }

    fn scan_total(&self) -> Result<u64> {
        let mut store = self.source.open()?;
        let spinner = self.spinner();
        let total = total_mapped(
            &mut store,
            &NameFilter::from_options(self.options),
            &spinner,
        )?;
        spinner.finish_and_clear();
        Ok(total)
    }

    ///
    /// Count all features and resolve the normalization denominator.
    ///
    fn count_and_normalize(&self, features: &[Feature]) -> Result<(Vec<Option<FeatureCount>>, f64)> {
        let scan = self.options.normalization == NormalizationMode::TotalMapped;

        let (counts, total) = rayon::join(
            || {
                self.map_features(features, "Counting features", |store, feature| {
                    self.count_feature(store, feature)
                })
            },
            || if scan { self.scan_total().map(Some) } else { Ok(None) },
        );
        let counts = counts?;
        let total = total?;

        let mut context = NormalizationContext::new(self.options.normalization);
        for count in counts.iter().flatten() {
            context.observe(&count.result);
        }
        let raw: Vec<f64> = counts.iter().flatten().map(|c| c.result.count).collect();
        let denominator = context.denominator(&raw, total);

        if denominator > 0.0 {
            info!("Normalization ({}): {} mapped reads", context.mode, denominator);
        } else if context.mode != NormalizationMode::None {
            warn!(
                "Normalization ({}) found no mapped reads, RPKM will not be reported",
                context.mode
            );
        }

        Ok((counts, denominator))
    }

    fn header(&self, denominator: f64, with_normalization: bool) -> ReportHeader {
        ReportHeader {
            multiple: self.options.multi_policy,
            stranded: self.options.stranded,
            normalization: with_normalization.then_some(self.options.normalization),
            mapped_count: denominator,
        }
    }

    fn tail_fields(&self, row: &mut Vec<Field>, count: &FeatureCount, length: u64, denominator: f64) {
        row.push(Field::Count(count.result.count));
        if let Some(stats) = count.coverage {
            row.push(Field::Real(stats.mean));
            row.push(Field::Real(stats.stdev));
        }
        if denominator > 0.0 {
            row.push(Field::MaybeReal(rpkm(count.result.count, length, denominator)));
        }
    }

    fn run_genes(&self, features: &[Feature]) -> Result<Report> {
        let (counts, denominator) = self.count_and_normalize(features)?;

        let mut rows = Vec::with_capacity(features.len());
        for (feature, count) in features.iter().zip(&counts) {
            let Some(count) = count else { continue };

            let spans = feature.spans();
            let (gene, isoid, tx_start, tx_end) = match &feature.kind {
                FeatureKind::Gene {
                    gene,
                    isoforms,
                    tx_start,
                    tx_end,
                } => (gene.clone(), isoforms.clone(), *tx_start, *tx_end),
                _ => (
                    feature.name(),
                    feature.name(),
                    spans.first().map(|r| r.start).unwrap_or(0),
                    spans.last().map(|r| r.end).unwrap_or(0),
                ),
            };
            let coding_len = feature.coding_length();

            let mut row: Vec<Field> = vec![
                gene.into(),
                isoid.into(),
                feature.reference.as_str().into(),
                feature.strand.to_string().into(),
                Field::Int(tx_start),
                Field::Int(tx_end),
                Field::Int(coding_len),
            ];
            self.tail_fields(&mut row, count, coding_len, denominator);
            rows.push(row);
        }

        Ok(Report {
            header: self.header(denominator, true),
            schema: ReportSchema::for_mode(RunMode::Rpkm, self.options.coverage, denominator > 0.0),
            rows,
        })
    }

    fn run_bed(&self, features: &[Feature]) -> Result<Report> {
        let (counts, denominator) = self.count_and_normalize(features)?;

        let mut rows = Vec::with_capacity(features.len());
        for (feature, count) in features.iter().zip(&counts) {
            let Some(count) = count else { continue };

            let spans = feature.spans();
            let (name, score) = match &feature.kind {
                FeatureKind::Interval { name, score } => (name.clone(), score.clone()),
                _ => (feature.name(), "0".to_string()),
            };
            let size = feature.coding_length();

            let mut row: Vec<Field> = vec![
                feature.reference.as_str().into(),
                Field::Int(spans.first().map(|r| r.start).unwrap_or(0)),
                Field::Int(spans.last().map(|r| r.end).unwrap_or(0)),
                name.into(),
                score.into(),
                feature.strand.to_string().into(),
                Field::Int(size),
            ];
            self.tail_fields(&mut row, count, size, denominator);
            rows.push(row);
        }

        Ok(Report {
            header: self.header(denominator, true),
            schema: ReportSchema::for_mode(RunMode::Bed, self.options.coverage, denominator > 0.0),
            rows,
        })
    }

    fn run_repeats(&self, features: &[Feature]) -> Result<Report> {
        let (counts, denominator) = self.count_and_normalize(features)?;

        // (family, member) -> (size, count); member "*" is the family total
        let mut totals: BTreeMap<(String, String), (u64, f64)> = BTreeMap::new();
        for (feature, count) in features.iter().zip(&counts) {
            let (family, member) = match &feature.kind {
                FeatureKind::Repeat { family, member } => (family.clone(), member.clone()),
                _ => (feature.name(), feature.name()),
            };
            let (size, value) = match count {
                Some(count) => (feature.coding_length(), count.result.count),
                None => (0, 0.0),
            };

            for key in [(family.clone(), "*".to_string()), (family, member)] {
                let entry = totals.entry(key).or_insert((0, 0.0));
                entry.0 += size;
                entry.1 += value;
            }
        }

        let (family_rows, member_rows): (Vec<_>, Vec<_>) =
            totals.into_iter().partition(|((_, member), _)| member == "*");

        let rows = family_rows
            .into_iter()
            .chain(member_rows)
            .map(|((family, member), (size, count))| {
                let mut row: Vec<Field> = vec![
                    family.into(),
                    member.into(),
                    Field::Int(size),
                    Field::Count(count),
                ];
                if denominator > 0.0 {
                    row.push(Field::MaybeReal(rpkm(count, size, denominator)));
                }
                row
            })
            .collect();

        Ok(Report {
            header: self.header(denominator, true),
            schema: ReportSchema::for_mode(RunMode::Repeat, false, denominator > 0.0),
            rows,
        })
    }

    fn run_alt(&self, features: &[Feature]) -> Result<Report> {
        let profiles: Vec<Option<AltSpliceProfile>> =
            self.map_features(features, "Alt-splice index", |store, feature| {
                let counter = OverlapCounter::from_options(self.options)
                    .with_strand(self.strand_filter(feature));
                alt_splice_profile(&counter, store, feature)
            })?;

        let mut rows = Vec::new();
        for (feature, profile) in features.iter().zip(&profiles) {
            let Some(profile) = profile else { continue };

            let (gene, isoid) = match &feature.kind {
                FeatureKind::Gene { gene, isoforms, .. } => (gene.clone(), isoforms.clone()),
                _ => (feature.name(), feature.name()),
            };

            for region in &profile.regions {
                let r = region.region.region;
                rows.push(vec![
                    isoid.as_str().into(),
                    gene.as_str().into(),
                    Field::Count(profile.const_count),
                    Field::Int(region.region.index as u64),
                    Field::from(if region.region.is_constant { "const" } else { "alt" }),
                    "".into(),
                    feature.reference.as_str().into(),
                    feature.strand.to_string().into(),
                    Field::Int(r.start),
                    Field::Int(r.end),
                    Field::Int(r.width()),
                    Field::Count(region.count),
                    Field::MaybeReal(region.alt_index),
                ]);
            }
        }

        Ok(Report {
            header: self.header(0.0, false),
            schema: ReportSchema::for_mode(RunMode::Alt, false, false),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use rpkmtools_core::errors::StoreResult;
    use rpkmtools_core::models::{AlignedRead, FeatureRegion, Region};
    use rpkmtools_core::store::InMemoryStore;
    use rstest::*;

    fn interval(name: &str, reference: &str, start: u64, end: u64) -> Feature {
        Feature::new(
            FeatureKind::Interval {
                name: name.to_string(),
                score: "0".to_string(),
            },
            reference,
            Strand::Forward,
            vec![FeatureRegion::new(1, Region::new(start, end).unwrap(), false)],
        )
    }

    #[fixture]
    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
        store.extend([
            AlignedRead::new("r1", "chr1", 100, 150, false).with_multiplicity(1),
            AlignedRead::new("r2", "chr1", 120, 170, false).with_multiplicity(1),
            AlignedRead::new("r3", "chr1", 500, 550, false).with_multiplicity(1),
        ]);
        store
    }

    #[rstest]
    fn test_results_follow_catalog_order(store: InMemoryStore) {
        let mut options = CountOptions::for_mode(RunMode::Bed);
        options.threads = 4;
        let features: Vec<Feature> = (0..50)
            .map(|i| interval(&format!("f{}", i), "chr1", i * 20, i * 20 + 10))
            .collect();

        let report = CountEngine::new(&store, &options).run(&features).unwrap();
        let names: Vec<String> = report.rows.iter().map(|r| r[3].to_string()).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("f{}", i)).collect();
        assert_eq!(names, expected);
    }

    #[rstest]
    fn test_unknown_reference_has_no_row(store: InMemoryStore) {
        let options = CountOptions::for_mode(RunMode::Bed);
        let features = vec![
            interval("a", "chr1", 100, 200),
            interval("b", "chrUn", 100, 200),
        ];

        let report = CountEngine::new(&store, &options).run(&features).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.header.mapped_count, 2.0);
    }

    #[rstest]
    fn test_total_mapped_runs_alongside_counting(store: InMemoryStore) {
        let mut options = CountOptions::for_mode(RunMode::Bed);
        options.normalization = NormalizationMode::TotalMapped;
        options.threads = 2;
        let features = vec![interval("a", "chr1", 100, 200)];

        let report = CountEngine::new(&store, &options).run(&features).unwrap();
        assert_eq!(report.header.mapped_count, 3.0);
        assert_eq!(report.schema.columns.last(), Some(&"RPKM"));
    }

    #[rstest]
    fn test_no_normalization_omits_rpkm(store: InMemoryStore) {
        let mut options = CountOptions::for_mode(RunMode::Bed);
        options.normalization = NormalizationMode::None;
        let features = vec![interval("a", "chr1", 100, 200)];

        let report = CountEngine::new(&store, &options).run(&features).unwrap();
        assert_eq!(report.header.mapped_count, 0.0);
        assert_eq!(report.schema.columns.last(), Some(&"count"));
        assert_eq!(report.rows[0].len(), 8);
    }

    /// Opens `healthy` handles, then fails every open with an I/O error.
    struct FlakySource {
        store: InMemoryStore,
        healthy: usize,
        opened: AtomicUsize,
    }

    impl StoreSource for FlakySource {
        type Store = InMemoryStore;

        fn open(&self) -> StoreResult<InMemoryStore> {
            if self.opened.fetch_add(1, Ordering::SeqCst) < self.healthy {
                Ok(self.store.clone())
            } else {
                Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "permission denied",
                )))
            }
        }
    }

    #[rstest]
    #[case::first_open(0)]
    #[case::worker_open(1)]
    fn test_open_failure_keeps_store_error(store: InMemoryStore, #[case] healthy: usize) {
        let source = FlakySource {
            store,
            healthy,
            opened: AtomicUsize::new(0),
        };
        let mut options = CountOptions::for_mode(RunMode::Bed);
        options.threads = 2;
        let features = vec![interval("a", "chr1", 100, 200), interval("b", "chr1", 400, 600)];

        let err = CountEngine::new(&source, &options).run(&features).unwrap_err();
        assert!(matches!(err, CountError::Store(StoreError::Io(_))), "{:?}", err);
    }
}
