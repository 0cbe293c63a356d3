pub mod feature;
pub mod read;
pub mod region;

// re-export for cleaner imports
pub use self::feature::{Feature, FeatureKind, FeatureRegion};
pub use self::read::{AlignedBlock, AlignedRead, BlockKind, PileupColumn, PileupEntry};
pub use self::region::{Region, Strand};
