//! Indexed BAM files as an [`AlignmentStore`].
//!
//! You must provide a .bai file alongside the bam file! Create one: `samtools index your_file.bam`

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use noodles::bam;
use noodles::bgzf;
use noodles::core::region::Interval;
use noodles::core::{Position, Region as QueryRegion};
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;

use rpkmtools_core::errors::{StoreError, StoreResult};
use rpkmtools_core::models::{AlignedBlock, AlignedRead, BlockKind};
use rpkmtools_core::store::{AlignmentStore, StoreSource};

/// Default aux tag holding the number of equally good hits for a read.
pub const DEFAULT_MULTIPLICITY_TAG: &str = "IH";

///
/// Parse a two character aux tag name such as `IH` or `NH`.
///
pub fn parse_tag(tag: &str) -> StoreResult<[u8; 2]> {
    let bytes = tag.as_bytes();
    if bytes.len() != 2 {
        return Err(StoreError::OpenError(format!(
            "Tag must be 2 bytes long: {}",
            tag
        )));
    }
    Ok([bytes[0], bytes[1]])
}

///
/// Convert alignment operations into reference blocks.
///
/// Adjacent match-like operations (M, =, X) are merged; deletions become their
/// own blocks; reference skips (N) advance the position without a block.
/// Insertions, clips and padding consume no reference.
///
pub fn blocks_from_ops<I>(start: u64, ops: I) -> Vec<AlignedBlock>
where
    I: IntoIterator<Item = (Kind, usize)>,
{
    let mut blocks: Vec<AlignedBlock> = Vec::new();
    let mut ref_pos = start;

    for (kind, len) in ops {
        let len = len as u64;
        match kind {
            Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                match blocks.last_mut() {
                    Some(last) if last.kind == BlockKind::Match && last.end == ref_pos => {
                        last.end += len;
                    }
                    _ => blocks.push(AlignedBlock {
                        start: ref_pos,
                        end: ref_pos + len,
                        kind: BlockKind::Match,
                    }),
                }
                ref_pos += len;
            }
            Kind::Deletion => {
                blocks.push(AlignedBlock {
                    start: ref_pos,
                    end: ref_pos + len,
                    kind: BlockKind::Deletion,
                });
                ref_pos += len;
            }
            Kind::Skip => {
                ref_pos += len;
            }
            Kind::Insertion | Kind::SoftClip | Kind::HardClip | Kind::Pad => {}
        }
    }

    blocks
}

/// Factory for [`BamStore`] handles over one BAM file.
#[derive(Debug, Clone)]
pub struct BamSource {
    path: PathBuf,
    multiplicity_tag: [u8; 2],
}

impl BamSource {
    pub fn new<P: AsRef<Path>>(path: P, multiplicity_tag: &str) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::OpenError(format!("{}", path.display())));
        }

        Ok(BamSource {
            path: path.to_path_buf(),
            multiplicity_tag: parse_tag(multiplicity_tag)?,
        })
    }
}

impl StoreSource for BamSource {
    type Store = BamStore;

    fn open(&self) -> StoreResult<BamStore> {
        BamStore::open(&self.path, self.multiplicity_tag)
    }
}

///
/// One open, indexed BAM file.
///
pub struct BamStore {
    path: PathBuf,
    reader: bam::io::IndexedReader<bgzf::Reader<File>>,
    header: sam::Header,
    references: Vec<String>,
    multiplicity_tag: [u8; 2],
}

impl BamStore {
    pub fn open(path: &Path, multiplicity_tag: [u8; 2]) -> StoreResult<Self> {
        let mut reader = bam::io::indexed_reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| StoreError::OpenError(format!("{}: {}", path.display(), e)))?;
        let header = reader.read_header()?;

        let references = header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect();

        Ok(BamStore {
            path: path.to_path_buf(),
            reader,
            header,
            references,
            multiplicity_tag,
        })
    }

    fn convert(&self, record: &bam::Record, reference: &str) -> io::Result<AlignedRead> {
        let name = record
            .name()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();

        let flags = record.flags();
        let multiplicity = match record.data().get(&self.multiplicity_tag) {
            Some(value) => value?.as_int().map(|n| n.max(0) as u32),
            None => None,
        };

        let start = match record.alignment_start().transpose()? {
            Some(position) => (usize::from(position) - 1) as u64,
            None => 0,
        };

        let mut read = AlignedRead::new(name, reference, start, start, flags.is_reverse_complemented());
        read.multiplicity = multiplicity;

        if flags.is_unmapped() {
            return Ok(read.unmapped());
        }

        let ops = record
            .cigar()
            .iter()
            .map(|op| op.map(|op| (op.kind(), op.len())))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(read.with_blocks(blocks_from_ops(start, ops)))
    }

    fn reference_name(&self, record: &bam::Record) -> io::Result<String> {
        let name = match record.reference_sequence_id().transpose()? {
            Some(id) => self
                .header
                .reference_sequences()
                .get_index(id)
                .map(|(name, _)| name.to_string())
                .unwrap_or_default(),
            None => String::new(),
        };
        Ok(name)
    }
}

impl AlignmentStore for BamStore {
    fn references(&self) -> Vec<String> {
        self.references.clone()
    }

    fn has_reference(&self, name: &str) -> bool {
        self.references.iter().any(|r| r == name)
    }

    fn fetch(&mut self, reference: &str, start: u64, end: u64) -> StoreResult<Vec<AlignedRead>> {
        let invalid = || StoreError::InvalidInterval {
            reference: reference.to_string(),
            start,
            end,
        };

        if end <= start {
            return Err(invalid());
        }
        if !self.has_reference(reference) {
            return Err(StoreError::UnknownReference(reference.to_string()));
        }

        // noodles regions are 1-based and closed
        let from = Position::try_from(start as usize + 1).map_err(|_| invalid())?;
        let to = Position::try_from(end as usize).map_err(|_| invalid())?;
        let region = QueryRegion::new(reference.to_string(), Interval::from(from..=to));

        let records = self
            .reader
            .query(&self.header, &region)?
            .collect::<io::Result<Vec<bam::Record>>>()?;

        let mut reads = Vec::with_capacity(records.len());
        for record in &records {
            if record.flags().is_unmapped() {
                continue;
            }
            let read = self
                .convert(record, reference)
                .map_err(|e| StoreError::MalformedRecord(e.to_string()))?;
            if read.overlaps(start, end) {
                reads.push(read);
            }
        }

        Ok(reads)
    }

    fn for_each_read(&mut self, visitor: &mut dyn FnMut(&AlignedRead)) -> StoreResult<()> {
        debug!("Scanning all records in {}", self.path.display());

        let mut reader = bam::io::reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| StoreError::OpenError(format!("{}: {}", self.path.display(), e)))?;
        reader.read_header()?;

        for result in reader.records() {
            let record = result?;
            let reference = self.reference_name(&record)?;
            let read = self
                .convert(&record, &reference)
                .map_err(|e| StoreError::MalformedRecord(e.to_string()))?;
            visitor(&read);
        }

        Ok(())
    }
}
