use std::io::BufRead;

use rpkmtools_core::models::{Feature, FeatureKind, FeatureRegion, Region, Strand};

use super::{FeatureCatalog, parse_coord, split_columns};
use crate::error::{CatalogError, Result};

const HEADER_LINES: usize = 3;

/// RepeatMasker `.out` tables.
///
/// The first three lines are a header. Columns are whitespace separated; the
/// ones used are query sequence (5), begin (6, 1-based), end (7), strand (9, `+`
/// or `C`), matching repeat (10) and repeat class/family (11).
pub struct RepeatMasker;

impl FeatureCatalog for RepeatMasker {
    fn parse<R: BufRead>(reader: R) -> Result<Vec<Feature>> {
        let mut features = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if line_no <= HEADER_LINES || line.trim().is_empty() {
                continue;
            }

            let cols = split_columns(line.split_whitespace(), 11, line_no)?;
            let begin = parse_coord(cols[5], "begin", line_no)?;
            let end = parse_coord(cols[6], "end", line_no)?;
            let region = Region::new(begin.saturating_sub(1), end).map_err(|e| {
                CatalogError::ParseError {
                    line: line_no,
                    message: e.to_string(),
                }
            })?;

            let strand = match cols[8] {
                "+" => Strand::Forward,
                _ => Strand::Reverse,
            };

            features.push(Feature::new(
                FeatureKind::Repeat {
                    family: cols[10].to_string(),
                    member: cols[9].to_string(),
                },
                cols[4],
                strand,
                vec![FeatureRegion::new(1, region, false)],
            ));
        }

        Ok(features)
    }
}
