use log::debug;

use rpkmtools_core::models::{AlignedRead, BlockKind, Region, Strand};
use rpkmtools_core::store::AlignmentStore;

use crate::counter::NameFilter;
use crate::errors::Result;

/// Mean and sample standard deviation of per-base depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageStats {
    pub mean: f64,
    pub stdev: f64,
}

impl CoverageStats {
    pub fn undefined() -> Self {
        CoverageStats {
            mean: f64::NAN,
            stdev: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.mean.is_nan() && !self.stdev.is_nan()
    }
}

/// Consecutive bases sharing one depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRun {
    pub depth: u64,
    pub len: u64,
}

///
/// Exact running totals of per-base depth.
///
/// Bases are added a run at a time, so the memory used does not depend on
/// how wide the covered regions are.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthAccumulator {
    bases: u64,
    sum: u128,
    sum_sq: u128,
}

impl DepthAccumulator {
    pub fn add_run(&mut self, run: DepthRun) {
        let depth = run.depth as u128;
        let len = run.len as u128;
        self.bases += run.len;
        self.sum += depth * len;
        self.sum_sq += depth * depth * len;
    }

    pub fn bases(&self) -> u64 {
        self.bases
    }

    /// Mean and sample standard deviation; `None` for fewer than two bases.
    pub fn mean_stdev(&self) -> Option<(f64, f64)> {
        if self.bases < 2 {
            return None;
        }

        let n = self.bases as u128;
        let mean = self.sum as f64 / n as f64;
        // n * sum_sq >= sum^2 for any set of depths
        let variance = (n * self.sum_sq - self.sum * self.sum) as f64 / (n * (n - 1)) as f64;

        Some((mean, variance.sqrt()))
    }
}

///
/// Arithmetic mean and sample standard deviation (`N - 1` denominator).
///
/// Returns `None` for fewer than two values.
///
pub fn mean_stdev(values: &[u64]) -> Option<(f64, f64)> {
    let mut acc = DepthAccumulator::default();
    for value in values {
        acc.add_run(DepthRun { depth: *value, len: 1 });
    }
    acc.mean_stdev()
}

///
/// Depth over `[start, end)` as runs, from the match blocks of `reads` that
/// pass `accept`. Deletions and reference skips add no depth.
///
pub fn depth_runs<'r, F>(
    reads: impl IntoIterator<Item = &'r AlignedRead>,
    start: u64,
    end: u64,
    accept: F,
) -> Vec<DepthRun>
where
    F: Fn(&AlignedRead) -> bool,
{
    let mut events: Vec<(u64, i64)> = Vec::new();
    for read in reads.into_iter().filter(|r| accept(r)) {
        for block in read.blocks.iter().filter(|b| b.kind == BlockKind::Match) {
            let from = block.start.max(start);
            let to = block.end.min(end);
            if from < to {
                events.push((from, 1));
                events.push((to, -1));
            }
        }
    }
    events.sort_unstable();

    let mut runs = Vec::new();
    let mut cursor = start;
    let mut depth: i64 = 0;
    for (pos, delta) in events {
        if pos > cursor {
            runs.push(DepthRun {
                depth: depth as u64,
                len: pos - cursor,
            });
            cursor = pos;
        }
        depth += delta;
    }
    if cursor < end {
        runs.push(DepthRun {
            depth: depth as u64,
            len: end - cursor,
        });
    }

    runs
}

///
/// Depth runs over every region, concatenated in region order.
///
/// Only match bases of reads passing the name lists and the strand filter are
/// counted.
///
pub fn region_depth_runs<S>(
    store: &mut S,
    reference: &str,
    regions: &[Region],
    strand: Option<Strand>,
    names: &NameFilter,
) -> Result<Vec<DepthRun>>
where
    S: AlignmentStore + ?Sized,
{
    if !store.has_reference(reference) {
        debug!("Reference {} not in alignment store, no coverage", reference);
        return Ok(Vec::new());
    }

    let accept = |read: &AlignedRead| {
        strand.is_none_or(|s| s.matches(read.is_reverse)) && names.accepts(&read.name)
    };

    let mut runs = Vec::new();
    for region in regions {
        let reads = store.fetch(reference, region.start, region.end)?;
        runs.extend(depth_runs(&reads, region.start, region.end, &accept));
    }

    Ok(runs)
}

/// Coverage statistics over `regions`; undefined when fewer than two bases are covered.
pub fn summarize<S>(
    store: &mut S,
    reference: &str,
    regions: &[Region],
    strand: Option<Strand>,
    names: &NameFilter,
) -> Result<CoverageStats>
where
    S: AlignmentStore + ?Sized,
{
    let mut acc = DepthAccumulator::default();
    for run in region_depth_runs(store, reference, regions, strand, names)? {
        acc.add_run(run);
    }

    Ok(match acc.mean_stdev() {
        Some((mean, stdev)) => CoverageStats { mean, stdev },
        None => CoverageStats::undefined(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rpkmtools_core::models::AlignedBlock;
    use rpkmtools_core::store::InMemoryStore;
    use rstest::*;

    fn region(start: u64, end: u64) -> Region {
        Region::new(start, end).unwrap()
    }

    #[rstest]
    fn test_mean_stdev() {
        let (mean, stdev) = mean_stdev(&[3, 4, 5]).unwrap();
        assert_relative_eq!(mean, 4.0);
        assert_relative_eq!(stdev, 1.0);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![7])]
    fn test_mean_stdev_too_few_values(#[case] values: Vec<u64>) {
        assert_eq!(mean_stdev(&values), None);
    }

    #[fixture]
    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
        store.extend([
            AlignedRead::new("a", "chr1", 0, 3, false),
            AlignedRead::new("b", "chr1", 1, 3, false),
            AlignedRead::new("c", "chr1", 2, 3, true),
        ]);
        store
    }

    fn per_base(runs: &[DepthRun]) -> Vec<u64> {
        runs.iter()
            .flat_map(|r| std::iter::repeat_n(r.depth, r.len as usize))
            .collect()
    }

    #[rstest]
    fn test_region_depth_runs(mut store: InMemoryStore) {
        let names = NameFilter::default();
        let runs = region_depth_runs(&mut store, "chr1", &[region(0, 3)], None, &names).unwrap();
        assert_eq!(per_base(&runs), vec![1, 2, 3]);

        let forward =
            region_depth_runs(&mut store, "chr1", &[region(0, 3)], Some(Strand::Forward), &names)
                .unwrap();
        assert_eq!(per_base(&forward), vec![1, 2, 2]);
    }

    #[rstest]
    fn test_region_depth_runs_concatenates_regions(mut store: InMemoryStore) {
        let names = NameFilter::default();
        let runs =
            region_depth_runs(&mut store, "chr1", &[region(2, 3), region(0, 1)], None, &names)
                .unwrap();
        assert_eq!(per_base(&runs), vec![3, 1]);
    }

    #[rstest]
    fn test_depth_runs_skip_introns_and_deletions() {
        let spliced = AlignedRead::new("s", "chr1", 0, 0, false).with_blocks(vec![
            AlignedBlock { start: 10, end: 20, kind: BlockKind::Match },
            AlignedBlock { start: 20, end: 22, kind: BlockKind::Deletion },
            AlignedBlock { start: 22, end: 30, kind: BlockKind::Match },
            AlignedBlock { start: 130, end: 140, kind: BlockKind::Match },
        ]);
        let plain = AlignedRead::new("p", "chr1", 15, 125, false);

        let runs = depth_runs([&spliced, &plain], 0, 200, |_| true);
        assert_eq!(
            runs,
            vec![
                DepthRun { depth: 0, len: 10 },
                DepthRun { depth: 1, len: 5 },
                DepthRun { depth: 2, len: 5 },
                DepthRun { depth: 1, len: 2 },
                DepthRun { depth: 2, len: 8 },
                DepthRun { depth: 1, len: 95 },
                DepthRun { depth: 0, len: 5 },
                DepthRun { depth: 1, len: 10 },
                DepthRun { depth: 0, len: 60 },
            ]
        );
        assert_eq!(runs.iter().map(|r| r.len).sum::<u64>(), 200);
    }

    #[rstest]
    fn test_wide_region_summary_is_exact() {
        let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
        store.push(AlignedRead::new("a", "chr1", 0, 500_000_000, false));
        let stats = summarize(
            &mut store,
            "chr1",
            &[region(0, 1_000_000_000)],
            None,
            &NameFilter::default(),
        )
        .unwrap();

        assert_relative_eq!(stats.mean, 0.5);
        // half the bases at depth 1, half at 0
        let n = 1_000_000_000f64;
        assert_relative_eq!(stats.stdev, (0.25 * n / (n - 1.0)).sqrt(), epsilon = 1e-12);
    }

    #[rstest]
    fn test_summarize(mut store: InMemoryStore) {
        let stats =
            summarize(&mut store, "chr1", &[region(0, 3)], None, &NameFilter::default()).unwrap();
        assert_relative_eq!(stats.mean, 2.0);
        assert_relative_eq!(stats.stdev, 1.0);
    }

    #[rstest]
    fn test_summarize_single_base_is_undefined(mut store: InMemoryStore) {
        let stats =
            summarize(&mut store, "chr1", &[region(0, 1)], None, &NameFilter::default()).unwrap();
        assert!(!stats.is_defined());

        let missing =
            summarize(&mut store, "chrX", &[region(0, 10)], None, &NameFilter::default()).unwrap();
        assert!(!missing.is_defined());
    }
}
