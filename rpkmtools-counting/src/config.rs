use std::fmt::{self, Display};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fxhash::FxHashSet;
use log::warn;
use serde::{Deserialize, Serialize};

use rpkmtools_core::utils::read_name_list;

use crate::errors::{ConfigError, ConfigResult};

///
/// How reads with more than one equally good alignment are credited.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiPolicy {
    /// Every alignment gets a full count.
    #[default]
    Complete,
    /// Every alignment gets `1 / multiplicity`.
    Partial,
    /// Multi-mapped alignments are dropped.
    Ignore,
}

impl MultiPolicy {
    /// Credit awarded to one alignment of a read with `multiplicity` hits.
    pub fn credit(&self, multiplicity: u32) -> f64 {
        if multiplicity <= 1 {
            return 1.0;
        }
        match self {
            MultiPolicy::Complete => 1.0,
            MultiPolicy::Partial => 1.0 / multiplicity as f64,
            MultiPolicy::Ignore => 0.0,
        }
    }

    /// Whether the policy can't be applied without a multiplicity value.
    pub fn needs_multiplicity(&self) -> bool {
        !matches!(self, MultiPolicy::Complete)
    }
}

impl FromStr for MultiPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(MultiPolicy::Complete),
            "partial" => Ok(MultiPolicy::Partial),
            "ignore" => Ok(MultiPolicy::Ignore),
            _ => Err(ConfigError::InvalidMultiPolicy(s.to_string())),
        }
    }
}

impl Display for MultiPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MultiPolicy::Complete => "complete",
            MultiPolicy::Partial => "partial",
            MultiPolicy::Ignore => "ignore",
        };
        write!(f, "{}", s)
    }
}

///
/// Where the "million mapped reads" of RPKM comes from.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizationMode {
    /// Distinct read names that contributed to any feature.
    #[default]
    #[serde(rename = "genes")]
    PerFeatureReadSet,
    /// Distinct mapped read names in the whole alignment store.
    #[serde(rename = "total")]
    TotalMapped,
    /// Sum of the lower three quartiles of positive feature counts.
    #[serde(rename = "quartile")]
    TrimmedQuartileSum,
    #[serde(rename = "none")]
    None,
}

impl FromStr for NormalizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genes" => Ok(NormalizationMode::PerFeatureReadSet),
            "total" => Ok(NormalizationMode::TotalMapped),
            "quartile" => Ok(NormalizationMode::TrimmedQuartileSum),
            "none" => Ok(NormalizationMode::None),
            _ => Err(ConfigError::InvalidNormalization(s.to_string())),
        }
    }
}

impl Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NormalizationMode::PerFeatureReadSet => "genes",
            NormalizationMode::TotalMapped => "total",
            NormalizationMode::TrimmedQuartileSum => "quartile",
            NormalizationMode::None => "none",
        };
        write!(f, "{}", s)
    }
}

/// The four report flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Gene models, one row per gene.
    Rpkm,
    /// BED6 intervals, one row per interval.
    Bed,
    /// RepeatMasker annotations, summed per family and member.
    Repeat,
    /// Gene models, one row per sub-region with the alt-splice index.
    Alt,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpkm" => Ok(RunMode::Rpkm),
            "bed" => Ok(RunMode::Bed),
            "repeat" => Ok(RunMode::Repeat),
            "alt" => Ok(RunMode::Alt),
            _ => Err(ConfigError::InvalidRunMode(s.to_string())),
        }
    }
}

impl Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunMode::Rpkm => "rpkm",
            RunMode::Bed => "bed",
            RunMode::Repeat => "repeat",
            RunMode::Alt => "alt",
        };
        write!(f, "{}", s)
    }
}

fn default_multiple() -> String {
    MultiPolicy::default().to_string()
}

fn default_normalization() -> String {
    NormalizationMode::default().to_string()
}

fn default_tag() -> String {
    "IH".to_string()
}

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    1
}

///
/// User-facing run configuration, as read from a TOML file and/or the command line.
///
/// Policy strings are kept as given and only checked by [`CountConfig::validate`].
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountConfig {
    #[serde(default = "default_multiple")]
    pub multiple: String,
    #[serde(default = "default_normalization")]
    pub normalization: String,
    #[serde(default = "default_true")]
    pub stranded: bool,
    #[serde(default)]
    pub coverage: bool,
    #[serde(default)]
    pub uniq: bool,
    pub whitelist: Option<PathBuf>,
    pub blacklist: Option<PathBuf>,
    #[serde(default = "default_tag")]
    pub multiplicity_tag: String,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for CountConfig {
    fn default() -> Self {
        CountConfig {
            multiple: default_multiple(),
            normalization: default_normalization(),
            stranded: true,
            coverage: false,
            uniq: false,
            whitelist: None,
            blacklist: None,
            multiplicity_tag: default_tag(),
            threads: default_threads(),
            progress: true,
        }
    }
}

impl TryFrom<&Path> for CountConfig {
    type Error = ConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

fn load_names(path: &Option<PathBuf>) -> ConfigResult<Option<FxHashSet<String>>> {
    match path {
        Some(path) => read_name_list(path)
            .map(Some)
            .map_err(|e| ConfigError::NameList {
                path: path.clone(),
                message: format!("{:#}", e),
            }),
        None => Ok(None),
    }
}

impl CountConfig {
    ///
    /// Resolve the configuration for one run mode.
    ///
    /// Parses the policy strings, rejects combinations the mode can't report,
    /// and loads the read name lists.
    ///
    pub fn validate(&self, mode: RunMode) -> ConfigResult<CountOptions> {
        let multi_policy: MultiPolicy = self.multiple.parse()?;
        let normalization: NormalizationMode = self.normalization.parse()?;

        if mode == RunMode::Repeat && normalization == NormalizationMode::TrimmedQuartileSum {
            return Err(ConfigError::UnsupportedNormalization {
                mode: mode.to_string(),
                normalization: normalization.to_string(),
            });
        }

        if self.uniq && mode != RunMode::Bed {
            warn!("--uniq only applies to bed mode, ignoring it for {} mode", mode);
        }
        if self.coverage && matches!(mode, RunMode::Repeat | RunMode::Alt) {
            warn!("Coverage is not reported in {} mode, ignoring it", mode);
        }

        Ok(CountOptions {
            mode,
            multi_policy,
            normalization,
            stranded: self.stranded,
            coverage: self.coverage && matches!(mode, RunMode::Rpkm | RunMode::Bed),
            uniq: self.uniq && mode == RunMode::Bed,
            whitelist: load_names(&self.whitelist)?,
            blacklist: load_names(&self.blacklist)?,
            multiplicity_tag: self.multiplicity_tag.clone(),
            threads: self.threads.max(1),
            progress: self.progress,
        })
    }
}

/// Validated, immutable options for one counting run.
#[derive(Debug, Clone, PartialEq)]
pub struct CountOptions {
    pub mode: RunMode,
    pub multi_policy: MultiPolicy,
    pub normalization: NormalizationMode,
    pub stranded: bool,
    pub coverage: bool,
    pub uniq: bool,
    pub whitelist: Option<FxHashSet<String>>,
    pub blacklist: Option<FxHashSet<String>>,
    pub multiplicity_tag: String,
    pub threads: usize,
    pub progress: bool,
}

impl CountOptions {
    /// Defaults for `mode` with no name lists and progress reporting off.
    pub fn for_mode(mode: RunMode) -> Self {
        CountOptions {
            mode,
            multi_policy: MultiPolicy::default(),
            normalization: NormalizationMode::default(),
            stranded: true,
            coverage: false,
            uniq: false,
            whitelist: None,
            blacklist: None,
            multiplicity_tag: default_tag(),
            threads: 1,
            progress: false,
        }
    }
}
