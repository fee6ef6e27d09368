//! Error types for the classification pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while sampling, loading, standardizing or training.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Invalid settings, or a requested class with no usable source data.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no {variable} patch archive for {member} on {date}")]
    MissingArchive {
        member: String,
        variable: String,
        date: String,
    },

    #[error("archive error: {0}")]
    Archive(#[from] grid_archive::ArchiveError),

    #[error("failed to read or write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected array shape: {0}")]
    Shape(String),

    #[error("model error: {0}")]
    Model(String),
}

impl ClassifierError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape(msg: impl ToString) -> Self {
        Self::Shape(msg.to_string())
    }

    pub fn model(msg: impl ToString) -> Self {
        Self::Model(msg.to_string())
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result type for the classification pipeline.
pub type Result<T> = std::result::Result<T, ClassifierError>;
