//! Error types for GRIB2 parsing.

use thiserror::Error;

/// Errors raised while reading, indexing or unpacking GRIB2 messages.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("unpacking failed: {0}")]
    UnpackingError(String),

    #[error("failed to read GRIB2 file: {0}")]
    Io(#[from] std::io::Error),

    /// An index selection matched no records.
    #[error("no GRIB2 record matches {0}")]
    NoMatch(String),
}

/// Result type for GRIB2 operations.
pub type Result<T> = std::result::Result<T, Grib2Error>;
