//! The innermost counting primitive.
//!
//! [`OverlapCounter`] scans the alignment store over a set of regions on one
//! reference and decides, read by read, whether it counts for that set. Reads
//! go through the filters in a fixed order:
//!
//! 1. blacklist membership
//! 2. whitelist non-membership
//! 3. 5' position uniqueness (`uniq`)
//! 4. strand
//! 5. exclusivity (start and end both inside the region set)
//! 6. one count per read name
//!
//! Surviving reads are credited according to the [`MultiPolicy`].

use fxhash::FxHashSet;
use log::debug;

use rpkmtools_core::models::{AlignedRead, Region, Strand};
use rpkmtools_core::store::AlignmentStore;

use crate::config::{CountOptions, MultiPolicy};
use crate::errors::{CountError, Result};

/// Count for one region set plus the names of the reads that earned credit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountResult {
    pub count: f64,
    pub contributing_read_names: FxHashSet<String>,
}

/// Read name white/blacklists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameFilter<'a> {
    pub whitelist: Option<&'a FxHashSet<String>>,
    pub blacklist: Option<&'a FxHashSet<String>>,
}

impl<'a> NameFilter<'a> {
    pub fn from_options(options: &'a CountOptions) -> Self {
        NameFilter {
            whitelist: options.whitelist.as_ref(),
            blacklist: options.blacklist.as_ref(),
        }
    }

    #[inline]
    pub fn accepts(&self, name: &str) -> bool {
        if self.blacklist.is_some_and(|b| b.contains(name)) {
            return false;
        }
        self.whitelist.is_none_or(|w| w.contains(name))
    }
}

///
/// Credit for one alignment under `policy`.
///
/// `Complete` never looks at the multiplicity; the other policies fail when
/// the read carries none.
///
pub fn credit_for(policy: MultiPolicy, read: &AlignedRead) -> Result<f64> {
    match (policy, read.multiplicity) {
        (MultiPolicy::Complete, _) => Ok(1.0),
        (_, Some(multiplicity)) => Ok(policy.credit(multiplicity)),
        (_, None) => Err(CountError::MissingMultiplicity {
            read: read.name.clone(),
        }),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapCounter<'a> {
    pub names: NameFilter<'a>,
    /// `None` ignores read orientation.
    pub strand: Option<Strand>,
    pub policy: MultiPolicy,
    pub exclusive: bool,
    pub uniq: bool,
}

impl<'a> OverlapCounter<'a> {
    /// A non-exclusive counter configured from run options, not yet tied to a strand.
    pub fn from_options(options: &'a CountOptions) -> Self {
        OverlapCounter {
            names: NameFilter::from_options(options),
            strand: None,
            policy: options.multi_policy,
            exclusive: false,
            uniq: options.uniq,
        }
    }

    pub fn with_strand(mut self, strand: Option<Strand>) -> Self {
        self.strand = strand;
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    fn within_any(regions: &[Region], pos: u64) -> bool {
        regions.iter().any(|r| r.contains_closed(pos))
    }

    ///
    /// Count the reads on `reference` that belong to `regions`.
    ///
    /// A reference the store doesn't know yields an empty result.
    ///
    pub fn count<S>(&self, store: &mut S, reference: &str, regions: &[Region]) -> Result<CountResult>
    where
        S: AlignmentStore + ?Sized,
    {
        let mut result = CountResult::default();

        if !store.has_reference(reference) {
            debug!("Reference {} not in alignment store, skipping", reference);
            return Ok(result);
        }

        let mut seen_starts: FxHashSet<(u64, bool)> = FxHashSet::default();
        let mut seen_names: FxHashSet<String> = FxHashSet::default();

        for region in regions {
            for read in store.fetch(reference, region.start, region.end)? {
                if !self.names.accepts(&read.name) {
                    continue;
                }
                if self.uniq && !seen_starts.insert(read.five_prime_key()) {
                    continue;
                }
                if let Some(strand) = self.strand {
                    if !strand.matches(read.is_reverse) {
                        continue;
                    }
                }
                if self.exclusive
                    && !(Self::within_any(regions, read.pos)
                        && Self::within_any(regions, read.aligned_end))
                {
                    continue;
                }
                if seen_names.contains(&read.name) {
                    continue;
                }

                let credit = credit_for(self.policy, &read)?;
                seen_names.insert(read.name.clone());
                if credit > 0.0 {
                    result.count += credit;
                    result.contributing_read_names.insert(read.name);
                }
            }
        }

        Ok(result)
    }
}
