/// What a stretch of the alignment does to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Aligned bases (M, = or X operations).
    Match,
    /// Reference bases deleted from the read (D operation).
    Deletion,
}

/// A reference-coordinate block `[start, end)` produced by one alignment operation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedBlock {
    pub start: u64,
    pub end: u64,
    pub kind: BlockKind,
}

///
/// Read-only view of one alignment record.
///
/// `pos` is the leftmost 0-based aligned base and `aligned_end` is one past the
/// rightmost aligned base. `multiplicity` is `None` when the record carries no
/// hit-count information.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRead {
    pub name: String,
    pub reference: String,
    pub pos: u64,
    pub aligned_end: u64,
    pub is_reverse: bool,
    pub is_unmapped: bool,
    pub multiplicity: Option<u32>,
    pub blocks: Vec<AlignedBlock>,
}

impl AlignedRead {
    /// A mapped read with a single ungapped match block `[pos, aligned_end)`.
    pub fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        pos: u64,
        aligned_end: u64,
        is_reverse: bool,
    ) -> Self {
        AlignedRead {
            name: name.into(),
            reference: reference.into(),
            pos,
            aligned_end,
            is_reverse,
            is_unmapped: false,
            multiplicity: None,
            blocks: vec![AlignedBlock {
                start: pos,
                end: aligned_end,
                kind: BlockKind::Match,
            }],
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: u32) -> Self {
        self.multiplicity = Some(multiplicity);
        self
    }

    /// Replace the block structure; `pos`/`aligned_end` are recomputed from it.
    pub fn with_blocks(mut self, blocks: Vec<AlignedBlock>) -> Self {
        if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
            self.pos = first.start;
            self.aligned_end = last.end;
        }
        self.blocks = blocks;
        self
    }

    pub fn unmapped(mut self) -> Self {
        self.is_unmapped = true;
        self.blocks.clear();
        self
    }

    /// Strand-aware 5' position: leftmost base for forward reads, the
    /// exclusive alignment end for reverse reads.
    pub fn five_prime_key(&self) -> (u64, bool) {
        if self.is_reverse {
            (self.aligned_end, true)
        } else {
            (self.pos, false)
        }
    }

    #[inline]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.pos < end && self.aligned_end > start
    }
}

/// One read's contribution to a pileup column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupEntry {
    pub name: String,
    pub is_reverse: bool,
    pub is_deletion: bool,
}

/// All reads covering one reference base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupColumn {
    pub position: u64,
    pub entries: Vec<PileupEntry>,
}

impl PileupColumn {
    pub fn new(position: u64) -> Self {
        PileupColumn {
            position,
            entries: Vec::new(),
        }
    }
}
