//! Reads one variable across a run's forecast files.

use std::path::PathBuf;

use grib2_parser::Grib2Index;
use ndarray::{s, Array3};
use tracing::{debug, info};

use crate::error::{GridReadError, Result};
use crate::lightning;
use crate::request::ForecastRequest;
use crate::resolve::resolve_layer;

/// Default root of the lightning count archives.
pub const DEFAULT_LIGHTNING_ROOT: &str = "lightning_data";

/// A `(time, y, x)` grid and its units.
#[derive(Debug, Clone)]
pub struct GridField {
    pub data: Array3<f32>,
    pub units: String,
}

impl GridField {
    pub fn time_steps(&self) -> usize {
        self.data.shape()[0]
    }

    /// (rows, cols)
    pub fn grid_dims(&self) -> (usize, usize) {
        (self.data.shape()[1], self.data.shape()[2])
    }
}

/// Loads a [`ForecastRequest`].
///
/// Existing files are matched to time steps by position. The output grid is
/// sized by the first file read and filled with NaN, so steps beyond the
/// available files stay NaN.
pub struct GridReader {
    request: ForecastRequest,
    lightning_root: PathBuf,
}

impl GridReader {
    pub fn new(request: ForecastRequest) -> Self {
        Self {
            request,
            lightning_root: PathBuf::from(DEFAULT_LIGHTNING_ROOT),
        }
    }

    pub fn with_lightning_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.lightning_root = root.into();
        self
    }

    pub fn request(&self) -> &ForecastRequest {
        &self.request
    }

    /// Files from the request that exist on disk, in request order.
    pub fn existing_files(&self) -> Vec<PathBuf> {
        self.request
            .files
            .iter()
            .filter(|path| path.exists())
            .cloned()
            .collect()
    }

    /// Read the variable from every existing file.
    ///
    /// Returns `Ok(None)` when there is nothing to read: no forecast files
    /// exist, or a lightning hour is missing.
    pub fn load_data(&self) -> Result<Option<GridField>> {
        let request = &self.request;

        if request.variable.is_lightning() {
            let variable = request.variable.to_string();
            return lightning::load_lightning(&self.lightning_root, request, &variable);
        }

        let files = self.existing_files();
        if files.is_empty() {
            info!(
                member = %request.member,
                run_date = %request.run_date,
                "No {} model runs on {}",
                request.member,
                request.run_date
            );
            return Ok(None);
        }

        let time_steps = request.num_time_steps();
        if files.len() > time_steps {
            return Err(GridReadError::invalid_request(format!(
                "{} files for {} time steps",
                files.len(),
                time_steps
            )));
        }

        let mut data: Option<Array3<f32>> = None;
        let mut units = String::new();

        for (t, path) in files.iter().enumerate() {
            let index = Grib2Index::open(path)?;
            let layer = resolve_layer(&index, &request.variable, path)?;
            let dims = layer.values.dim();

            let grid = data.get_or_insert_with(|| {
                debug!(time_steps, rows = dims.0, cols = dims.1, "Allocating grid");
                Array3::from_elem((time_steps, dims.0, dims.1), f32::NAN)
            });

            let expected = (grid.shape()[1], grid.shape()[2]);
            if dims != expected {
                return Err(GridReadError::ShapeMismatch {
                    path: path.clone(),
                    expected,
                    found: dims,
                });
            }

            grid.slice_mut(s![t, .., ..]).assign(&layer.values);
            units = layer.units;
        }

        Ok(data.map(|data| GridField { data, units }))
    }
}
