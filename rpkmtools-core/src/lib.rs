//! Core data model for rpkmtools.
//!
//! This crate holds the pieces every other rpkmtools crate agrees on:
//!
//! - [`models`]: genomic [`Region`](models::Region)s, countable
//!   [`Feature`](models::Feature)s and the read-only view of an aligned read
//! - [`store`]: the [`AlignmentStore`](store::AlignmentStore) abstraction the
//!   counting engine queries, plus an in-memory implementation
//! - [`utils`]: small reader helpers shared by the annotation readers and the CLI
//!
//! # Example
//!
//! ```rust
//! use rpkmtools_core::models::{AlignedRead, Region};
//! use rpkmtools_core::store::{AlignmentStore, InMemoryStore};
//!
//! let mut store = InMemoryStore::new(vec!["chr1".to_string()]);
//! store.push(AlignedRead::new("r1", "chr1", 100, 150, false).with_multiplicity(1));
//!
//! let region = Region::new(90, 120).unwrap();
//! let hits = store.fetch("chr1", region.start, region.end).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

pub mod errors;
pub mod models;
pub mod store;
pub mod utils;

pub use errors::{RegionError, StoreError};
