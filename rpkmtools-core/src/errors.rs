use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegionError {
    #[error("Region end must be greater than start: [{start}, {end})")]
    EmptyRegion { start: u64, end: u64 },

    #[error("Invalid strand: {0}")]
    InvalidStrand(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Can't open alignment file: {0}")]
    OpenError(String),

    #[error("Reference sequence not present in alignment header: {0}")]
    UnknownReference(String),

    #[error("Invalid query interval {reference}:{start}-{end}")]
    InvalidInterval {
        reference: String,
        start: u64,
        end: u64,
    },

    #[error("Malformed alignment record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
