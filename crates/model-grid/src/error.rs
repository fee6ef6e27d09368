//! Error types for grid reads.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving and reading a forecast variable.
#[derive(Error, Debug)]
pub enum GridReadError {
    /// The variable could not be resolved after every fallback tier.
    #[error("could not find {variable} in {path}")]
    Lookup { variable: String, path: PathBuf },

    /// A bare name matched more than one record.
    #[error("multiple '{name}' records found ({count}); rename with level: '{name}_level'")]
    Ambiguous { name: String, count: usize },

    #[error("invalid forecast request: {0}")]
    InvalidRequest(String),

    /// A file's grid differs from the grid of the first file read.
    #[error("grid in {path} is {found:?}, expected {expected:?}")]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("GRIB2 error: {0}")]
    Grib2(#[from] grib2_parser::Grib2Error),

    #[error("archive error: {0}")]
    Archive(#[from] grid_archive::ArchiveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridReadError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

/// Result type for grid reads.
pub type Result<T> = std::result::Result<T, GridReadError>;
