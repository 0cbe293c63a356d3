//! # Region-based read counting and normalization.
//!
//! The engine behind `rpkmtools`: it decides which aligned reads belong to a
//! feature, turns those decisions into (possibly fractional) counts, derives a
//! library-size denominator, and assembles one of four reports.
//!
//! - [`counter`]: the [`OverlapCounter`](counter::OverlapCounter) primitive
//! - [`blocks`]: constitutive block counts and the alt-splice index
//! - [`normalization`]: the four denominator strategies and RPKM
//! - [`coverage`]: per-base depth summaries
//! - [`report`]: output schema and formatting
//! - [`engine`]: parallel execution of a whole run
//!
//! # Example
//!
//! ```rust
//! use rpkmtools_core::models::{AlignedRead, Feature, FeatureKind, FeatureRegion, Region, Strand};
//! use rpkmtools_core::store::InMemoryStore;
//! use rpkmtools_counting::{CountEngine, CountOptions, RunMode};
//!
//! let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
//! store.push(AlignedRead::new("r1", "chr1", 100, 150, false).with_multiplicity(1));
//!
//! let features = vec![Feature::new(
//!     FeatureKind::Interval { name: "peak".to_string(), score: "0".to_string() },
//!     "chr1",
//!     Strand::Forward,
//!     vec![FeatureRegion::new(1, Region::new(100, 200).unwrap(), false)],
//! )];
//!
//! let options = CountOptions::for_mode(RunMode::Bed);
//! let report = CountEngine::new(&store, &options).run(&features).unwrap();
//! assert_eq!(report.rows.len(), 1);
//! ```
pub mod blocks;
pub mod config;
pub mod counter;
pub mod coverage;
pub mod engine;
pub mod errors;
pub mod normalization;
pub mod report;

// re-export for cleaner imports
pub use config::{CountConfig, CountOptions, MultiPolicy, NormalizationMode, RunMode};
pub use counter::{CountResult, OverlapCounter};
pub use engine::CountEngine;
pub use errors::{ConfigError, CountError};
pub use report::Report;
