//! Per-variable z-score scaling.
//!
//! Statistics ignore NaN and NaN passes through scaling unchanged. The table
//! for a training run is computed once and persisted; later calls with the
//! same key reuse it.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array4, ArrayViewMut4, Axis, Dimension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingEntry {
    pub variable: String,
    pub mean: f64,
    pub std: f64,
}

/// Mean and standard deviation for each channel, in channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingTable {
    pub entries: Vec<ScalingEntry>,
}

/// NaN-aware mean and population standard deviation.
fn nan_mean_std<'a>(values: impl Iterator<Item = &'a f32> + Clone) -> (f64, f64) {
    let (sum, count) = values
        .clone()
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(s, n), &v| (s + f64::from(v), n + 1));
    if count == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = sum / count as f64;
    let ss: f64 = values
        .filter(|v| !v.is_nan())
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum();
    (mean, (ss / count as f64).sqrt())
}

impl ScalingTable {
    /// Statistics over the last axis of `data`.
    pub fn compute(data: &Array4<f32>, variables: &[String]) -> Result<Self> {
        check_channels(data.raw_dim(), variables.len())?;

        let entries = variables
            .iter()
            .enumerate()
            .map(|(v, variable)| {
                let channel = data.index_axis(Axis(3), v);
                let (mean, std) = nan_mean_std(channel.iter());
                ScalingEntry {
                    variable: variable.clone(),
                    mean,
                    std,
                }
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn variables(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.variable.as_str()).collect()
    }

    /// Scale `data` in place.
    pub fn apply(&self, mut data: ArrayViewMut4<f32>) -> Result<()> {
        check_channels(data.raw_dim(), self.entries.len())?;

        for (v, entry) in self.entries.iter().enumerate() {
            // Constant or empty channels centre to zero rather than NaN.
            let std = if entry.std.is_finite() && entry.std > 0.0 {
                entry.std
            } else {
                1.0
            };
            let mean = entry.mean as f32;
            let std = std as f32;
            data.index_axis_mut(Axis(3), v)
                .mapv_inplace(|x| (x - mean) / std);
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path).map_err(|e| ClassifierError::csv(path, e))?;
        for entry in &self.entries {
            writer
                .serialize(entry)
                .map_err(|e| ClassifierError::csv(path, e))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| ClassifierError::csv(path, e))?;
        let entries = reader
            .deserialize()
            .collect::<std::result::Result<Vec<ScalingEntry>, _>>()
            .map_err(|e| ClassifierError::csv(path, e))?;
        Ok(Self { entries })
    }
}

fn check_channels<D: Dimension>(dim: D, channels: usize) -> Result<()> {
    let found = dim.slice().last().copied().unwrap_or(0);
    if found != channels {
        return Err(ClassifierError::shape(format!(
            "data has {} channels, scaling covers {}",
            found, channels
        )));
    }
    Ok(())
}

/// Scales tensors with the table persisted at `path`.
pub struct Standardizer {
    path: PathBuf,
    variables: Vec<String>,
}

impl Standardizer {
    pub fn new(path: impl Into<PathBuf>, variables: Vec<String>) -> Self {
        Self {
            path: path.into(),
            variables,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scale `data` with the persisted table, computing and saving it from
    /// `data` first when none exists.
    pub fn standardize(&self, mut data: Array4<f32>) -> Result<(Array4<f32>, ScalingTable)> {
        let table = if self.path.exists() {
            self.load_checked()?
        } else {
            let table = ScalingTable::compute(&data, &self.variables)?;
            table.save(&self.path)?;
            info!(path = %self.path.display(), "Wrote scaling values");
            table
        };

        table.apply(data.view_mut())?;
        Ok((data, table))
    }

    /// The persisted table; its absence is a configuration error.
    pub fn existing(&self) -> Result<ScalingTable> {
        if !self.path.exists() {
            return Err(ClassifierError::configuration(format!(
                "no scaling values at {}; train the member first",
                self.path.display()
            )));
        }
        self.load_checked()
    }

    fn load_checked(&self) -> Result<ScalingTable> {
        let table = ScalingTable::load(&self.path)?;
        if table.variables() != self.variables.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(ClassifierError::configuration(format!(
                "scaling values in {} cover {:?}, configuration has {:?}",
                self.path.display(),
                table.variables(),
                self.variables
            )));
        }
        info!(path = %self.path.display(), "Opened scaling values");
        Ok(table)
    }
}
