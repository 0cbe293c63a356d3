use std::io::BufRead;

use fxhash::FxHashMap;
use rpkmtools_core::models::{Feature, FeatureKind, FeatureRegion, Region, Strand};

use super::{FeatureCatalog, parse_coord, split_columns};
use crate::error::{CatalogError, Result};

/// refFlat-style gene models.
///
/// Columns: `geneName, name, chrom, strand, txStart, txEnd, cdsStart, cdsEnd,
/// exonCount, exonStarts, exonEnds`. Isoforms sharing `(geneName, chrom, strand)`
/// collapse into one gene feature whose regions are the exonic pieces between
/// consecutive isoform exon boundaries. A piece is constant when every isoform
/// of the gene covers it.
pub struct GeneModel;

#[derive(Debug)]
struct Isoform {
    name: String,
    tx_start: u64,
    tx_end: u64,
    exons: Vec<Region>,
}

#[derive(Debug)]
struct GeneGroup {
    gene: String,
    chrom: String,
    strand: Strand,
    isoforms: Vec<Isoform>,
}

fn parse_coord_list(value: &str, what: &str, line: usize) -> Result<Vec<u64>> {
    value
        .trim_end_matches(',')
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_coord(s, what, line))
        .collect()
}

fn parse_isoform(cols: &[&str], line: usize) -> Result<Isoform> {
    let parse_error = |message: String| CatalogError::ParseError { line, message };

    let tx_start = parse_coord(cols[4], "txStart", line)?;
    let tx_end = parse_coord(cols[5], "txEnd", line)?;
    let exon_count = parse_coord(cols[8], "exonCount", line)? as usize;
    let starts = parse_coord_list(cols[9], "exonStarts", line)?;
    let ends = parse_coord_list(cols[10], "exonEnds", line)?;

    if starts.len() != exon_count || ends.len() != exon_count {
        return Err(parse_error(format!(
            "exonCount is {} but found {} starts and {} ends",
            exon_count,
            starts.len(),
            ends.len()
        )));
    }

    let exons = starts
        .into_iter()
        .zip(ends)
        .map(|(s, e)| Region::new(s, e).map_err(|err| parse_error(err.to_string())))
        .collect::<Result<Vec<Region>>>()?;

    Ok(Isoform {
        name: cols[1].to_string(),
        tx_start,
        tx_end,
        exons,
    })
}

/// Cut the union of isoform exons at every exon boundary and tag each piece.
fn collapse_regions(isoforms: &[Isoform]) -> Vec<FeatureRegion> {
    let mut boundaries: Vec<u64> = isoforms
        .iter()
        .flat_map(|iso| iso.exons.iter().flat_map(|e| [e.start, e.end]))
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut regions = Vec::new();
    for w in boundaries.windows(2) {
        let (start, end) = (w[0], w[1]);
        let covering = isoforms
            .iter()
            .filter(|iso| iso.exons.iter().any(|e| e.start <= start && e.end >= end))
            .count();

        if covering == 0 {
            continue;
        }

        if let Ok(region) = Region::new(start, end) {
            regions.push(FeatureRegion::new(
                regions.len() as u32 + 1,
                region,
                covering == isoforms.len(),
            ));
        }
    }

    regions
}

impl FeatureCatalog for GeneModel {
    fn parse<R: BufRead>(reader: R) -> Result<Vec<Feature>> {
        let mut groups: Vec<GeneGroup> = Vec::new();
        let mut index: FxHashMap<(String, String, Strand), usize> = FxHashMap::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let cols = split_columns(trimmed.split('\t'), 11, line_no)?;
            let strand = Strand::from_annotation(cols[3]);
            let isoform = parse_isoform(&cols, line_no)?;

            let key = (cols[0].to_string(), cols[2].to_string(), strand);
            let idx = *index.entry(key).or_insert_with(|| {
                groups.push(GeneGroup {
                    gene: cols[0].to_string(),
                    chrom: cols[2].to_string(),
                    strand,
                    isoforms: Vec::new(),
                });
                groups.len() - 1
            });
            groups[idx].isoforms.push(isoform);
        }

        let features = groups
            .into_iter()
            .map(|group| {
                let regions = collapse_regions(&group.isoforms);
                let tx_start = group.isoforms.iter().map(|i| i.tx_start).min().unwrap_or(0);
                let tx_end = group.isoforms.iter().map(|i| i.tx_end).max().unwrap_or(0);
                let isoforms = group
                    .isoforms
                    .iter()
                    .map(|i| i.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",");

                Feature::new(
                    FeatureKind::Gene {
                        gene: group.gene,
                        isoforms,
                        tx_start,
                        tx_end,
                    },
                    group.chrom,
                    group.strand,
                    regions,
                )
            })
            .collect();

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn fr(index: u32, start: u64, end: u64, is_constant: bool) -> FeatureRegion {
        FeatureRegion::new(index, Region::new(start, end).unwrap(), is_constant)
    }

    #[fixture]
    fn refflat() -> &'static str {
        concat!(
            "GENE1\tNM_1\tchr1\t+\t100\t400\t100\t400\t2\t100,300,\t200,400,\n",
            "GENE1\tNM_2\tchr1\t+\t100\t400\t100\t400\t2\t100,350,\t200,400,\n",
            "GENE2\tNM_3\tchr2\t-\t10\t60\t10\t60\t1\t10,\t60,\n",
        )
    }

    #[rstest]
    fn test_groups_isoforms_by_gene(refflat: &str) {
        let features = GeneModel::parse(Cursor::new(refflat)).unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(
            features[0].kind,
            FeatureKind::Gene {
                gene: "GENE1".to_string(),
                isoforms: "NM_1,NM_2".to_string(),
                tx_start: 100,
                tx_end: 400,
            }
        );
        assert_eq!(features[1].strand, Strand::Reverse);
    }

    #[rstest]
    fn test_constant_and_alternative_pieces(refflat: &str) {
        let features = GeneModel::parse(Cursor::new(refflat)).unwrap();
        assert_eq!(
            features[0].regions,
            vec![
                fr(1, 100, 200, true),
                fr(2, 300, 350, false),
                fr(3, 350, 400, true),
            ]
        );
        assert_eq!(features[0].coding_length(), 200);
    }

    #[rstest]
    fn test_single_isoform_is_all_constant(refflat: &str) {
        let features = GeneModel::parse(Cursor::new(refflat)).unwrap();
        assert_eq!(features[1].regions, vec![fr(1, 10, 60, true)]);
    }

    #[rstest]
    fn test_exon_count_mismatch() {
        let input = "G\tNM\tchr1\t+\t0\t10\t0\t10\t2\t0,\t10,\n";
        let result = GeneModel::parse(Cursor::new(input));
        assert!(matches!(result, Err(CatalogError::ParseError { line: 1, .. })));
    }
}
