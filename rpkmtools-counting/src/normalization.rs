//! Library-size denominators for RPKM.

use fxhash::FxHashSet;
use indicatif::ProgressBar;

use rpkmtools_core::models::AlignedRead;
use rpkmtools_core::store::AlignmentStore;

use crate::config::NormalizationMode;
use crate::counter::{CountResult, NameFilter};
use crate::errors::Result;

const QUARTILE_LOWER: f64 = 0.0;
const QUARTILE_UPPER: f64 = 0.75;

/// Union of contributing read names across features.
#[derive(Debug, Clone, Default)]
pub struct ReadNameUnion {
    names: FxHashSet<String>,
}

impl ReadNameUnion {
    pub fn merge(&mut self, names: &FxHashSet<String>) {
        self.names.extend(names.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

///
/// Sum of positive counts between the 0th and 75th percentile.
///
/// Counts `<= 0` are dropped, the rest sorted ascending, and the slice
/// `[floor(0.0 * N), floor(0.75 * N))` summed. No positive counts gives `0`.
///
pub fn trimmed_quartile_sum(counts: &[f64]) -> f64 {
    let mut positive: Vec<f64> = counts.iter().copied().filter(|c| *c > 0.0).collect();
    positive.sort_by(|a, b| a.total_cmp(b));

    let n = positive.len() as f64;
    let lower = (QUARTILE_LOWER * n).floor() as usize;
    let upper = (QUARTILE_UPPER * n).floor() as usize;

    positive[lower..upper].iter().sum()
}

///
/// Number of distinct mapped read names in the whole store that pass the name lists.
///
pub fn total_mapped<S>(store: &mut S, names: &NameFilter, progress: &ProgressBar) -> Result<u64>
where
    S: AlignmentStore + ?Sized,
{
    let mut mapped: FxHashSet<String> = FxHashSet::default();
    let mut scanned: u64 = 0;

    store.for_each_read(&mut |read: &AlignedRead| {
        scanned += 1;
        if scanned % 100_000 == 0 {
            progress.set_position(scanned);
        }
        if read.is_unmapped || !names.accepts(&read.name) {
            return;
        }
        if !mapped.contains(&read.name) {
            mapped.insert(read.name.clone());
        }
    })?;

    progress.set_position(scanned);
    Ok(mapped.len() as u64)
}

/// `count / (length / 1e3) / (denominator / 1e6)`; undefined for zero length or denominator.
pub fn rpkm(count: f64, length: u64, denominator: f64) -> Option<f64> {
    if length == 0 || denominator <= 0.0 {
        return None;
    }
    Some(count / (length as f64 / 1000.0) / (denominator / 1_000_000.0))
}

///
/// Normalization state for one run: the selected mode and the read name union
/// that the per-feature-read-set mode needs.
///
#[derive(Debug, Clone)]
pub struct NormalizationContext {
    pub mode: NormalizationMode,
    union: ReadNameUnion,
}

impl NormalizationContext {
    pub fn new(mode: NormalizationMode) -> Self {
        NormalizationContext {
            mode,
            union: ReadNameUnion::default(),
        }
    }

    /// Fold one feature's result into the running state.
    pub fn observe(&mut self, result: &CountResult) {
        if self.mode == NormalizationMode::PerFeatureReadSet {
            self.union.merge(&result.contributing_read_names);
        }
    }

    ///
    /// The final denominator. `counts` are the per-feature counts (used by the
    /// quartile mode) and `total_mapped` the full-store scan result (used by the
    /// total mode). Zero means "no normalization available".
    ///
    pub fn denominator(&self, counts: &[f64], total_mapped: Option<u64>) -> f64 {
        match self.mode {
            NormalizationMode::PerFeatureReadSet => self.union.len() as f64,
            NormalizationMode::TotalMapped => total_mapped.unwrap_or(0) as f64,
            NormalizationMode::TrimmedQuartileSum => trimmed_quartile_sum(counts),
            NormalizationMode::None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rpkmtools_core::store::InMemoryStore;
    use rstest::*;

    fn result(names: &[&str]) -> CountResult {
        CountResult {
            count: names.len() as f64,
            contributing_read_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[rstest]
    #[case(vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0], 12.0)]
    #[case(vec![10.0, 0.0, 6.0, 2.0, 8.0, 4.0], 12.0)]
    #[case(vec![5.0], 0.0)]
    #[case(vec![1.0, 2.0, 3.0, 4.0], 6.0)]
    #[case(vec![], 0.0)]
    #[case(vec![0.0, -1.0], 0.0)]
    fn test_trimmed_quartile_sum(#[case] counts: Vec<f64>, #[case] expected: f64) {
        assert_eq!(trimmed_quartile_sum(&counts), expected);
    }

    #[rstest]
    fn test_rpkm() {
        assert_relative_eq!(rpkm(20.0, 2000, 1_000_000.0).unwrap(), 10.0);
        assert_eq!(rpkm(20.0, 0, 1_000_000.0), None);
        assert_eq!(rpkm(20.0, 2000, 0.0), None);
    }

    #[rstest]
    fn test_total_mapped_dedups_names() {
        let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
        store.extend([
            AlignedRead::new("split", "chr1", 100, 150, false),
            AlignedRead::new("split", "chr1", 400, 450, false),
            AlignedRead::new("other", "chr1", 10, 50, true),
            AlignedRead::new("lost", "chr1", 0, 1, false).unmapped(),
            AlignedRead::new("banned", "chr1", 10, 50, true),
        ]);
        let blacklist: FxHashSet<String> = ["banned".to_string()].into_iter().collect();
        let names = NameFilter {
            whitelist: None,
            blacklist: Some(&blacklist),
        };

        let total = total_mapped(&mut store, &names, &ProgressBar::hidden()).unwrap();
        assert_eq!(total, 2);
    }

    #[rstest]
    fn test_per_feature_read_set_union() {
        let mut ctx = NormalizationContext::new(NormalizationMode::PerFeatureReadSet);
        ctx.observe(&result(&["a", "b"]));
        ctx.observe(&result(&["b", "c"]));
        assert_eq!(ctx.denominator(&[], None), 3.0);
    }

    #[rstest]
    #[case(NormalizationMode::TotalMapped, 1000.0)]
    #[case(NormalizationMode::TrimmedQuartileSum, 12.0)]
    #[case(NormalizationMode::None, 0.0)]
    fn test_denominator_by_mode(#[case] mode: NormalizationMode, #[case] expected: f64) {
        let mut ctx = NormalizationContext::new(mode);
        ctx.observe(&result(&["a", "b"]));
        let counts = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];
        assert_eq!(ctx.denominator(&counts, Some(1000)), expected);
    }
}
