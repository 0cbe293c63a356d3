use std::io::BufRead;

use rpkmtools_core::models::{Feature, FeatureKind, FeatureRegion, Region, Strand};

use super::{FeatureCatalog, parse_coord, split_columns};
use crate::error::{CatalogError, Result};

/// BED6 intervals: `chrom, start, end, name, score, strand`, one feature per line.
pub struct Bed6;

fn is_header(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

impl FeatureCatalog for Bed6 {
    fn parse<R: BufRead>(reader: R) -> Result<Vec<Feature>> {
        let mut features = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let trimmed = line.trim_end();
            if is_header(trimmed) {
                continue;
            }

            let cols = split_columns(trimmed.split('\t'), 6, line_no)?;
            let start = parse_coord(cols[1], "start", line_no)?;
            let end = parse_coord(cols[2], "end", line_no)?;
            let region = Region::new(start, end).map_err(|e| CatalogError::ParseError {
                line: line_no,
                message: e.to_string(),
            })?;

            features.push(Feature::new(
                FeatureKind::Interval {
                    name: cols[3].to_string(),
                    score: cols[4].to_string(),
                },
                cols[0],
                Strand::from_annotation(cols[5]),
                vec![FeatureRegion::new(1, region, false)],
            ));
        }

        Ok(features)
    }
}
