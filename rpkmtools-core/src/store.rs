//! The alignment store abstraction queried by the counting engine.
//!
//! An [`AlignmentStore`] answers three kinds of questions: which reads overlap an
//! interval, what the per-base pileup over an interval looks like, and what every
//! record in the store is (a full rewindable scan). Concrete stores live in
//! `rpkmtools-io`; [`InMemoryStore`] is provided here for small inputs and tests.

use std::sync::Arc;

use crate::errors::StoreResult;
use crate::models::{AlignedRead, BlockKind, PileupColumn, PileupEntry};

pub trait AlignmentStore {
    /// Names of all reference sequences known to the store.
    fn references(&self) -> Vec<String>;

    fn has_reference(&self, name: &str) -> bool {
        self.references().iter().any(|r| r == name)
    }

    /// Mapped reads whose aligned span overlaps `[start, end)` on `reference`.
    fn fetch(&mut self, reference: &str, start: u64, end: u64) -> StoreResult<Vec<AlignedRead>>;

    /// One column per base of `[start, end)`.
    ///
    /// Reads contribute an entry where a match block covers the base, and a
    /// deletion entry where a deletion block covers it. Reference skips
    /// contribute nothing.
    fn pileup(&mut self, reference: &str, start: u64, end: u64) -> StoreResult<Vec<PileupColumn>> {
        if end <= start {
            return Ok(Vec::new());
        }

        let reads = self.fetch(reference, start, end)?;
        let mut columns: Vec<PileupColumn> = (start..end).map(PileupColumn::new).collect();

        for read in &reads {
            for block in &read.blocks {
                let from = block.start.max(start);
                let to = block.end.min(end);
                for pos in from..to {
                    columns[(pos - start) as usize].entries.push(PileupEntry {
                        name: read.name.clone(),
                        is_reverse: read.is_reverse,
                        is_deletion: block.kind == BlockKind::Deletion,
                    });
                }
            }
        }

        Ok(columns)
    }

    /// Visit every record in the store, mapped or not, from the beginning.
    fn for_each_read(&mut self, visitor: &mut dyn FnMut(&AlignedRead)) -> StoreResult<()>;
}

/// Something that can hand out independent [`AlignmentStore`] handles, one per worker.
pub trait StoreSource: Sync {
    type Store: AlignmentStore;

    fn open(&self) -> StoreResult<Self::Store>;
}

///
/// Alignment store backed by a vector of reads. Cloning is cheap; clones share
/// the reads until one of them is modified.
///
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    references: Arc<Vec<String>>,
    reads: Arc<Vec<AlignedRead>>,
}

impl InMemoryStore {
    pub fn new(references: Vec<String>) -> Self {
        InMemoryStore {
            references: Arc::new(references),
            reads: Arc::new(Vec::new()),
        }
    }

    pub fn push(&mut self, read: AlignedRead) {
        Arc::make_mut(&mut self.reads).push(read);
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

impl Extend<AlignedRead> for InMemoryStore {
    fn extend<T: IntoIterator<Item = AlignedRead>>(&mut self, iter: T) {
        Arc::make_mut(&mut self.reads).extend(iter);
    }
}

impl AlignmentStore for InMemoryStore {
    fn references(&self) -> Vec<String> {
        self.references.as_ref().clone()
    }

    fn has_reference(&self, name: &str) -> bool {
        self.references.iter().any(|r| r == name)
    }

    fn fetch(&mut self, reference: &str, start: u64, end: u64) -> StoreResult<Vec<AlignedRead>> {
        Ok(self
            .reads
            .iter()
            .filter(|r| !r.is_unmapped && r.reference == reference && r.overlaps(start, end))
            .cloned()
            .collect())
    }

    fn for_each_read(&mut self, visitor: &mut dyn FnMut(&AlignedRead)) -> StoreResult<()> {
        self.reads.iter().for_each(|r| visitor(r));
        Ok(())
    }
}

impl StoreSource for InMemoryStore {
    type Store = InMemoryStore;

    fn open(&self) -> StoreResult<InMemoryStore> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::AlignedBlock;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new(vec!["chr1".to_string(), "chr2".to_string()]);
        store.push(AlignedRead::new("a", "chr1", 100, 110, false));
        store.push(AlignedRead::new("b", "chr1", 105, 115, true));
        store.push(AlignedRead::new("c", "chr2", 100, 110, false));
        store.push(AlignedRead::new("d", "chr1", 100, 110, false).unmapped());
        store.push(
            AlignedRead::new("e", "chr1", 0, 1, false).with_blocks(vec![
                AlignedBlock {
                    start: 102,
                    end: 104,
                    kind: BlockKind::Match,
                },
                AlignedBlock {
                    start: 104,
                    end: 106,
                    kind: BlockKind::Deletion,
                },
                AlignedBlock {
                    start: 106,
                    end: 108,
                    kind: BlockKind::Match,
                },
            ]),
        );
        store
    }

    #[rstest]
    fn test_has_reference(store: InMemoryStore) {
        assert!(store.has_reference("chr1"));
        assert!(!store.has_reference("chrX"));
    }

    #[rstest]
    fn test_fetch_skips_unmapped_and_other_references(mut store: InMemoryStore) {
        let names: Vec<String> = store
            .fetch("chr1", 100, 101)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a".to_string()]);
    }

    #[rstest]
    fn test_pileup_one_column_per_base(mut store: InMemoryStore) {
        let columns = store.pileup("chr1", 100, 110).unwrap();
        assert_eq!(columns.len(), 10);
        assert_eq!(columns[0].position, 100);

        let depth: Vec<usize> = columns
            .iter()
            .map(|c| c.entries.iter().filter(|e| !e.is_deletion).count())
            .collect();
        assert_eq!(depth, vec![1, 1, 2, 2, 1, 2, 3, 3, 2, 2]);

        let deletions = columns[4].entries.iter().filter(|e| e.is_deletion).count();
        assert_eq!(deletions, 1);
    }

    #[rstest]
    fn test_for_each_read_visits_everything(mut store: InMemoryStore) {
        let mut seen = 0;
        store.for_each_read(&mut |_| seen += 1).unwrap();
        assert_eq!(seen, 5);
    }

    #[rstest]
    fn test_open_shares_reads(store: InMemoryStore) {
        let mut handle = store.open().unwrap();
        assert_eq!(handle.fetch("chr2", 0, 1000).unwrap().len(), 1);
    }
}
