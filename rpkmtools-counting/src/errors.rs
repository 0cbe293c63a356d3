use std::path::PathBuf;

use rpkmtools_core::errors::StoreError;
use thiserror::Error;

/// Problems with the run configuration. All of them are raised before the
/// alignment store is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid multi-mapping policy '{0}', expected one of: complete, partial, ignore")]
    InvalidMultiPolicy(String),

    #[error("Invalid normalization '{0}', expected one of: genes, total, quartile, none")]
    InvalidNormalization(String),

    #[error("Invalid run mode '{0}', expected one of: rpkm, bed, repeat, alt")]
    InvalidRunMode(String),

    #[error("Normalization '{normalization}' is not supported in {mode} mode")]
    UnsupportedNormalization { mode: String, normalization: String },

    #[error("Can't load read name list {path:?}: {message}")]
    NameList { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum CountError {
    #[error(
        "Read '{read}' has no multiplicity tag, which the selected multi-mapping policy requires"
    )]
    MissingMultiplicity { read: String },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, CountError>;
