//! Configuration for archive writing.

use serde::{Deserialize, Serialize};

/// How new archives are chunked and compressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Chunk edge length for the two spatial (trailing) dimensions. Leading
    /// dimensions are chunked one slice at a time.
    pub chunk_size: usize,

    /// Compression codec.
    pub compression: ArchiveCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            compression: ArchiveCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl ArchiveConfig {
    /// Uncompressed archives; used by tests and small fixtures.
    pub fn uncompressed() -> Self {
        Self {
            compression: ArchiveCompression::None,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ARCHIVE_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION") {
            config.compression = ArchiveCompression::parse(&val);
        }

        if let Ok(val) = std::env::var("ARCHIVE_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVE_SHUFFLE") {
            config.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.compression != ArchiveCompression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Compression codec for archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl ArchiveCompression {
    /// Parse from string (case-insensitive); unknown names fall back to
    /// Blosc/Zstd.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ArchiveCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
