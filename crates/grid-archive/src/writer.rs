//! Zarr V3 writer for gridded archives.
//!
//! Every archive is a single array stored at the root (`/`) of a
//! filesystem store. The two trailing dimensions are spatial (y, x) and are
//! chunked by `chunk_size`; leading dimensions (time, patch, ...) get one
//! chunk per index.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::config::{ArchiveCompression, ArchiveConfig};
use crate::error::{ArchiveError, Result};

/// Free-form JSON attributes stored with an array.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Writer for creating archives on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct ArchiveWriter {
    config: ArchiveConfig,
}

impl ArchiveWriter {
    /// Create a new writer with the given configuration.
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Write a float32 array; NaN is the fill value.
    pub fn write_f32(
        &self,
        path: &Path,
        shape: &[usize],
        data: &[f32],
        attrs: Attributes,
    ) -> Result<()> {
        check_len(shape, data.len())?;
        let array = self.create_array(
            path,
            shape,
            DataType::Float32,
            FillValue::from(f32::NAN),
            attrs,
        )?;
        let subset = full_subset(shape)?;
        array
            .store_array_subset_elements(&subset, data)
            .map_err(ArchiveError::write)?;

        debug!(path = %path.display(), shape = ?shape, "Wrote float32 archive");
        Ok(())
    }

    /// Write an int32 array; -1 is the fill value.
    pub fn write_i32(
        &self,
        path: &Path,
        shape: &[usize],
        data: &[i32],
        attrs: Attributes,
    ) -> Result<()> {
        check_len(shape, data.len())?;
        let array = self.create_array(path, shape, DataType::Int32, FillValue::from(-1i32), attrs)?;
        let subset = full_subset(shape)?;
        array
            .store_array_subset_elements(&subset, data)
            .map_err(ArchiveError::write)?;

        debug!(path = %path.display(), shape = ?shape, "Wrote int32 archive");
        Ok(())
    }

    /// Create the store and array metadata. An existing archive at `path` is
    /// replaced.
    fn create_array(
        &self,
        path: &Path,
        shape: &[usize],
        data_type: DataType,
        fill_value: FillValue,
        attrs: Attributes,
    ) -> Result<Array<FilesystemStore>> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(ArchiveError::config(format!(
                "cannot create archive with shape {:?}",
                shape
            )));
        }
        self.config.validate().map_err(ArchiveError::config)?;

        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;
        let store = Arc::new(FilesystemStore::new(path).map_err(|e| ArchiveError::open(path, e))?);

        let chunk_grid: zarrs::array::ChunkGrid = self
            .chunk_shape(shape)
            .try_into()
            .map_err(|e| ArchiveError::config(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            shape.iter().map(|&d| d as u64).collect::<Vec<u64>>(),
            data_type,
            chunk_grid,
            fill_value,
        );
        let mut builder = binding.attributes(attrs);

        if self.config.compression != ArchiveCompression::None {
            builder = builder.bytes_to_bytes_codecs(vec![self.create_compression_codec()?]);
        }

        let array = builder.build(store, "/").map_err(ArchiveError::write)?;
        array.store_metadata().map_err(ArchiveError::write)?;
        Ok(array)
    }

    fn chunk_shape(&self, shape: &[usize]) -> Vec<u64> {
        let spatial_from = shape.len().saturating_sub(2);
        shape
            .iter()
            .enumerate()
            .map(|(i, &dim)| {
                if i < spatial_from {
                    1
                } else {
                    dim.min(self.config.chunk_size).max(1) as u64
                }
            })
            .collect()
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| ArchiveError::config("invalid compression level"))?;

        let (shuffle, typesize) = if self.config.shuffle {
            // both supported element types are 4 bytes wide
            (BloscShuffleMode::Shuffle, Some(4))
        } else {
            (BloscShuffleMode::NoShuffle, None)
        };

        let compressor = match self.config.compression {
            ArchiveCompression::None => {
                return Err(ArchiveError::config("no compression configured"));
            }
            ArchiveCompression::BloscLz4 => BloscCompressor::LZ4,
            ArchiveCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(ArchiveError::config)?;

        Ok(Arc::new(codec))
    }
}

fn check_len(shape: &[usize], len: usize) -> Result<()> {
    let expected: usize = shape.iter().product();
    if expected != len {
        return Err(ArchiveError::config(format!(
            "shape {:?} holds {} elements but {} were given",
            shape, expected, len
        )));
    }
    Ok(())
}

pub(crate) fn full_subset(shape: &[usize]) -> Result<ArraySubset> {
    ArraySubset::new_with_start_shape(
        vec![0; shape.len()],
        shape.iter().map(|&d| d as u64).collect(),
    )
    .map_err(ArchiveError::config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_shape_splits_spatial_dims() {
        let writer = ArchiveWriter::new(ArchiveConfig {
            chunk_size: 16,
            ..ArchiveConfig::uncompressed()
        });
        assert_eq!(writer.chunk_shape(&[24, 100, 32, 32]), vec![1, 1, 16, 16]);
        assert_eq!(writer.chunk_shape(&[8, 5]), vec![8, 5]);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::default();
        let err = writer
            .write_f32(&dir.path().join("a.zarr"), &[2, 3], &[0.0; 5], Attributes::new())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Config(_)));
    }

    #[test]
    fn test_empty_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::default();
        assert!(writer
            .write_i32(&dir.path().join("a.zarr"), &[0, 3], &[], Attributes::new())
            .is_err());
    }
}
