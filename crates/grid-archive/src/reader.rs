//! Reading archives back into `ndarray` arrays.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};
use tracing::debug;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::error::{ArchiveError, Result};
use crate::writer::{full_subset, Attributes};

/// An opened archive.
pub struct ArchiveReader {
    path: PathBuf,
    array: Array<FilesystemStore>,
}

impl ArchiveReader {
    /// Open the array stored at the root of the archive directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(ArchiveError::open(path, "no such archive"));
        }

        let store = FilesystemStore::new(path).map_err(|e| ArchiveError::open(path, e))?;
        let array = Array::open(Arc::new(store), "/").map_err(|e| ArchiveError::open(path, e))?;

        debug!(path = %path.display(), shape = ?array.shape(), "Opened archive");
        Ok(Self {
            path: path.to_path_buf(),
            array,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> Vec<usize> {
        self.array.shape().iter().map(|&d| d as usize).collect()
    }

    pub fn attributes(&self) -> &Attributes {
        self.array.attributes()
    }

    /// A string attribute, if present.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.array.attributes().get(key).and_then(|v| v.as_str())
    }

    /// Read the whole float32 array.
    pub fn read_f32(&self) -> Result<ArrayD<f32>> {
        self.expect_type(&DataType::Float32)?;
        let shape = self.shape();
        let subset = full_subset(&shape)?;
        let data: Vec<f32> = self
            .array
            .retrieve_array_subset_elements(&subset)
            .map_err(ArchiveError::read)?;
        to_ndarray(&shape, data)
    }

    /// Read the whole int32 array.
    pub fn read_i32(&self) -> Result<ArrayD<i32>> {
        self.expect_type(&DataType::Int32)?;
        let shape = self.shape();
        let subset = full_subset(&shape)?;
        let data: Vec<i32> = self
            .array
            .retrieve_array_subset_elements(&subset)
            .map_err(ArchiveError::read)?;
        to_ndarray(&shape, data)
    }

    /// Read a float32 hyper-rectangle starting at `start`.
    pub fn read_f32_subset(&self, start: &[usize], shape: &[usize]) -> Result<ArrayD<f32>> {
        self.expect_type(&DataType::Float32)?;

        let full = self.shape();
        let in_bounds = start.len() == full.len()
            && shape.len() == full.len()
            && start
                .iter()
                .zip(shape)
                .zip(&full)
                .all(|((&s, &n), &dim)| s + n <= dim);
        if !in_bounds {
            return Err(ArchiveError::read(format!(
                "subset start {:?} shape {:?} outside array {:?} in {}",
                start,
                shape,
                full,
                self.path.display()
            )));
        }

        let subset = ArraySubset::new_with_start_shape(
            start.iter().map(|&s| s as u64).collect(),
            shape.iter().map(|&n| n as u64).collect(),
        )
        .map_err(ArchiveError::read)?;
        let data: Vec<f32> = self
            .array
            .retrieve_array_subset_elements(&subset)
            .map_err(ArchiveError::read)?;
        to_ndarray(shape, data)
    }

    fn expect_type(&self, data_type: &DataType) -> Result<()> {
        if self.array.data_type() != data_type {
            return Err(ArchiveError::read(format!(
                "{} holds {:?}, expected {:?}",
                self.path.display(),
                self.array.data_type(),
                data_type
            )));
        }
        Ok(())
    }
}

fn to_ndarray<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(ArchiveError::read)
}
