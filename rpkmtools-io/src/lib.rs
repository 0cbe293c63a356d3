//! # Input side of rpkmtools.
//!
//! Concrete implementations of the two collaborators the counting engine talks to:
//!
//! - [`bam`]: an indexed BAM file exposed as an
//!   [`AlignmentStore`](rpkmtools_core::store::AlignmentStore)
//! - [`catalog`]: readers turning BED6, refFlat gene models and RepeatMasker
//!   output into ordered [`Feature`](rpkmtools_core::models::Feature) lists
//!
pub mod bam;
pub mod catalog;
pub mod error;

// re-expose core functions
pub use bam::{BamSource, BamStore};
pub use catalog::{Bed6, FeatureCatalog, GeneModel, RepeatMasker};
pub use error::*;
