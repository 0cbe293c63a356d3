use rpkmtools_core::models::{Feature, FeatureRegion};
use rpkmtools_core::store::AlignmentStore;

use crate::counter::OverlapCounter;
use crate::errors::Result;

/// `region_count / const_count`, undefined when there is no constitutive signal.
pub fn alt_index(region_count: f64, const_count: f64) -> Option<f64> {
    if const_count > 0.0 {
        Some(region_count / const_count)
    } else {
        None
    }
}

///
/// Sum of exclusive counts over the feature's constitutive blocks.
///
/// Each maximal run of constant regions is counted as one region set, so a read
/// spliced across two adjacent constant pieces still counts for the block, while
/// one reaching into an alternative piece does not.
///
pub fn constitutive_count<S>(counter: &OverlapCounter, store: &mut S, feature: &Feature) -> Result<f64>
where
    S: AlignmentStore + ?Sized,
{
    let counter = counter.with_exclusive(true);
    let mut total = 0.0;
    for block in feature.constant_blocks() {
        total += counter.count(store, &feature.reference, &block)?.count;
    }
    Ok(total)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionAltCount {
    pub region: FeatureRegion,
    pub count: f64,
    pub alt_index: Option<f64>,
}

/// Per-region counts of one gene, relative to its constitutive count.
#[derive(Debug, Clone, PartialEq)]
pub struct AltSpliceProfile {
    pub const_count: f64,
    pub regions: Vec<RegionAltCount>,
}

pub fn alt_splice_profile<S>(
    counter: &OverlapCounter,
    store: &mut S,
    feature: &Feature,
) -> Result<AltSpliceProfile>
where
    S: AlignmentStore + ?Sized,
{
    let const_count = constitutive_count(counter, store, feature)?;
    let counter = counter.with_exclusive(false);

    let regions = feature
        .regions
        .iter()
        .map(|r| {
            let count = counter.count(store, &feature.reference, &[r.region])?.count;
            Ok(RegionAltCount {
                region: r.clone(),
                count,
                alt_index: alt_index(count, const_count),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AltSpliceProfile {
        const_count,
        regions,
    })
}
