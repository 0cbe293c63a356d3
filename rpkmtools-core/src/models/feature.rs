use crate::models::region::{Region, Strand};

/// One numbered sub-region of a feature.
///
/// `is_constant` marks exonic pieces shared by every isoform of a gene; it is
/// always `false` for BED intervals and repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRegion {
    pub index: u32,
    pub region: Region,
    pub is_constant: bool,
}

impl FeatureRegion {
    pub fn new(index: u32, region: Region, is_constant: bool) -> Self {
        FeatureRegion {
            index,
            region,
            is_constant,
        }
    }
}

/// Identity of a feature, one variant per annotation source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// A gene with its collapsed isoforms.
    Gene {
        gene: String,
        isoforms: String,
        tx_start: u64,
        tx_end: u64,
    },
    /// One BED6 interval. The score column is carried through untouched.
    Interval { name: String, score: String },
    /// One repeat annotation line, grouped by `(family, member)`.
    Repeat { family: String, member: String },
}

///
/// A named, strand-oriented set of regions on one reference, counted as a unit.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub kind: FeatureKind,
    pub reference: String,
    pub strand: Strand,
    pub regions: Vec<FeatureRegion>,
}

impl Feature {
    pub fn new(
        kind: FeatureKind,
        reference: impl Into<String>,
        strand: Strand,
        regions: Vec<FeatureRegion>,
    ) -> Self {
        Feature {
            kind,
            reference: reference.into(),
            strand,
            regions,
        }
    }

    /// Human readable name used in logs and progress messages.
    pub fn name(&self) -> String {
        match &self.kind {
            FeatureKind::Gene { gene, .. } => gene.clone(),
            FeatureKind::Interval { name, .. } => name.clone(),
            FeatureKind::Repeat { family, member } => format!("{}|{}", family, member),
        }
    }

    /// Sum of all region widths
    pub fn coding_length(&self) -> u64 {
        self.regions.iter().map(|r| r.region.width()).sum()
    }

    pub fn spans(&self) -> Vec<Region> {
        self.regions.iter().map(|r| r.region).collect()
    }

    /// Maximal runs of consecutive constant regions, in region order.
    ///
    /// A single non-constant region ends the current run.
    pub fn constant_blocks(&self) -> Vec<Vec<Region>> {
        let mut blocks: Vec<Vec<Region>> = Vec::new();
        let mut last_const = false;

        for r in &self.regions {
            if r.is_constant {
                if !last_const {
                    blocks.push(Vec::new());
                }
                if let Some(block) = blocks.last_mut() {
                    block.push(r.region);
                }
                last_const = true;
            } else {
                last_const = false;
            }
        }

        blocks
    }
}
