//! Tab-delimited report output.
//!
//! Every run mode produces a [`Report`]: a metadata header, a column header
//! chosen by [`ReportSchema`], and rows of [`Field`]s in column order.

use std::fmt::{self, Display};
use std::io::{self, Write};

use crate::config::{MultiPolicy, NormalizationMode, RunMode};

/// Shortest decimal for a count: `2` when whole, `2.5` otherwise.
pub fn format_count(value: f64) -> String {
    format!("{}", value)
}

/// Always a real number: `10.0`, `0.25`, `NaN`.
pub fn format_real(value: f64) -> String {
    format!("{:?}", value)
}

/// One output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    Int(u64),
    Count(f64),
    Real(f64),
    /// A real number that may be undefined; undefined prints as an empty cell.
    MaybeReal(Option<f64>),
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(s) => write!(f, "{}", s),
            Field::Int(n) => write!(f, "{}", n),
            Field::Count(c) => write!(f, "{}", format_count(*c)),
            Field::Real(r) => write!(f, "{}", format_real(*r)),
            Field::MaybeReal(Some(r)) => write!(f, "{}", format_real(*r)),
            Field::MaybeReal(None) => Ok(()),
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

///
/// Column layout for one run mode.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSchema {
    pub columns: Vec<&'static str>,
}

impl ReportSchema {
    /// `coverage` adds the two coverage columns (rpkm and bed modes),
    /// `rpkm` the trailing RPKM column (all modes but alt).
    pub fn for_mode(mode: RunMode, coverage: bool, rpkm: bool) -> Self {
        let mut columns: Vec<&'static str> = match mode {
            RunMode::Rpkm => vec![
                "gene",
                "isoid",
                "chrom",
                "strand",
                "txStart",
                "txEnd",
                "coding_len",
                "count",
            ],
            RunMode::Bed => vec![
                "chrom", "start", "end", "name", "score", "strand", "size", "count",
            ],
            RunMode::Repeat => vec!["family", "repeat", "length", "count"],
            RunMode::Alt => {
                return ReportSchema {
                    columns: vec![
                        "iso_id",
                        "gene",
                        "const_count",
                        "region_num",
                        "const_alt",
                        "altEvent",
                        "chrom",
                        "strand",
                        "start",
                        "end",
                        "length",
                        "count",
                        "alt_index",
                    ],
                };
            }
        };

        if coverage {
            match mode {
                RunMode::Rpkm => columns.extend(["coverage_mean", "coverage_stdev"]),
                RunMode::Bed => columns.extend(["cover_mean", "cover_stdev"]),
                _ => {}
            }
        }
        if rpkm {
            columns.push("RPKM");
        }

        ReportSchema { columns }
    }
}

/// Metadata block written before the column header.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub multiple: MultiPolicy,
    pub stranded: bool,
    /// `None` leaves the normalization line out.
    pub normalization: Option<NormalizationMode>,
    pub mapped_count: f64,
}

impl Display for ReportHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#multiple\t{}", self.multiple)?;
        if !self.stranded {
            writeln!(f, "#nostrand")?;
        }
        if let Some(mode) = self.normalization {
            writeln!(f, "#normalization\t{}", mode)?;
        }
        if self.mapped_count > 0.0 {
            writeln!(f, "#mapped_count\t{}", format_count(self.mapped_count))?;
        }
        writeln!(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub header: ReportHeader,
    pub schema: ReportSchema,
    pub rows: Vec<Vec<Field>>,
}

impl Report {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{}", self.header)?;
        writeln!(writer, "{}", self.schema.columns.join("\t"))?;

        for row in &self.rows {
            let line = row
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(writer, "{}", line)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(Field::Count(2.0), "2")]
    #[case(Field::Count(2.5), "2.5")]
    #[case(Field::Count(0.0), "0")]
    #[case(Field::Real(10.0), "10.0")]
    #[case(Field::Real(0.25), "0.25")]
    #[case(Field::Real(f64::NAN), "NaN")]
    #[case(Field::MaybeReal(None), "")]
    #[case(Field::MaybeReal(Some(1.5)), "1.5")]
    #[case(Field::Int(42), "42")]
    fn test_field_format(#[case] field: Field, #[case] expected: &str) {
        assert_eq!(field.to_string(), expected);
    }

    #[rstest]
    fn test_schema_columns() {
        let schema = ReportSchema::for_mode(RunMode::Bed, true, true);
        assert_eq!(
            schema.columns,
            vec![
                "chrom",
                "start",
                "end",
                "name",
                "score",
                "strand",
                "size",
                "count",
                "cover_mean",
                "cover_stdev",
                "RPKM"
            ]
        );

        let schema = ReportSchema::for_mode(RunMode::Repeat, false, false);
        assert_eq!(schema.columns, vec!["family", "repeat", "length", "count"]);

        let alt = ReportSchema::for_mode(RunMode::Alt, true, true);
        assert_eq!(alt.columns.len(), 13);
    }

    #[rstest]
    fn test_write_report() {
        let report = Report {
            header: ReportHeader {
                multiple: MultiPolicy::Partial,
                stranded: false,
                normalization: Some(NormalizationMode::PerFeatureReadSet),
                mapped_count: 3.0,
            },
            schema: ReportSchema::for_mode(RunMode::Repeat, false, true),
            rows: vec![vec![
                "LINE".into(),
                "*".into(),
                Field::Int(100),
                Field::Count(1.5),
                Field::MaybeReal(None),
            ]],
        };

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#multiple\tpartial\n#nostrand\n#normalization\tgenes\n#mapped_count\t3\n\nfamily\trepeat\tlength\tcount\tRPKM\nLINE\t*\t100\t1.5\t\n"
        );
    }
}
