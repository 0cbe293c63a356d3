use std::io;
use thiserror::Error;

/// Error type for annotation catalog readers.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// IO error occurred while reading the annotation.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The annotation file could not be opened.
    #[error("Can't read annotation file: {0}")]
    FileReadError(String),

    /// A line did not have the expected number of columns.
    #[error("Line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A column could not be parsed.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
