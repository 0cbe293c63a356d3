use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::RegionError;

///
/// Half-open, 0-based interval `[start, end)` on one reference sequence.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub start: u64,
    pub end: u64,
}

impl Region {
    ///
    /// Create a region, rejecting empty or inverted intervals.
    ///
    pub fn new(start: u64, end: u64) -> Result<Self, RegionError> {
        if end <= start {
            return Err(RegionError::EmptyRegion { start, end });
        }
        Ok(Region { start, end })
    }

    ///
    /// Number of bases covered by the region
    ///
    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    /// Check if `[start, end)` overlaps this region
    #[inline]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && self.end > start
    }

    /// Closed containment test `start <= pos <= end`.
    ///
    /// Both ends are inclusive so that an exclusive alignment end sitting exactly
    /// on the region end is still inside.
    #[inline]
    pub fn contains_closed(&self, pos: u64) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Strand of a feature, or of the orientation a read must have to be counted.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    /// Map an annotation strand column, treating anything but `+`/`-` as unknown.
    pub fn from_annotation(s: &str) -> Strand {
        s.parse().unwrap_or(Strand::Unknown)
    }

    /// Whether a read with the given orientation matches this strand.
    /// An unknown strand matches everything.
    #[inline]
    pub fn matches(&self, is_reverse: bool) -> bool {
        match self {
            Strand::Forward => !is_reverse,
            Strand::Reverse => is_reverse,
            Strand::Unknown => true,
        }
    }
}

impl FromStr for Strand {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unknown),
            _ => Err(RegionError::InvalidStrand(s.to_string())),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unknown => ".",
        };
        write!(f, "{}", s)
    }
}
