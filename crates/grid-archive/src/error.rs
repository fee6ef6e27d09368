//! Error types for archive access.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to open an archive.
    #[error("failed to open archive {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    /// Failed to read array data.
    #[error("failed to read archive data: {0}")]
    Read(String),

    /// Failed to create or write an array.
    #[error("failed to write archive: {0}")]
    Write(String),

    /// Invalid archive configuration or array shape.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Create an Open error.
    pub fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Read error.
    pub fn read(msg: impl ToString) -> Self {
        Self::Read(msg.to_string())
    }

    /// Create a Write error.
    pub fn write(msg: impl ToString) -> Self {
        Self::Write(msg.to_string())
    }

    /// Create a Config error.
    pub fn config(msg: impl ToString) -> Self {
        Self::Config(msg.to_string())
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
