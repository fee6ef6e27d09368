//! Pre-gridded lightning strike counts.
//!
//! Counts live in one archive per valid hour:
//! `{root}/{YYYYMMDD}/{YYYYMMDD}T{HH}_counts_{variable}.zarr`, where the day
//! is the run date advanced by `forecast_hour / 24` and `HH` is
//! `forecast_hour % 24`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use grid_archive::ArchiveReader;
use ndarray::{s, Array3, Ix2};
use tracing::{debug, info};

use crate::error::{GridReadError, Result};
use crate::reader::GridField;
use crate::request::ForecastRequest;

pub const COUNT_UNITS: &str = "counts";

/// Archive holding the counts for one forecast hour of a run.
pub fn lightning_path(
    root: &Path,
    run_date: DateTime<Utc>,
    forecast_hour: i64,
    variable: &str,
) -> Result<PathBuf> {
    if forecast_hour < 0 {
        return Err(GridReadError::invalid_request(format!(
            "lightning counts need a non-negative forecast hour, got {}",
            forecast_hour
        )));
    }

    let day = (run_date + Duration::days(forecast_hour / 24)).format("%Y%m%d").to_string();
    Ok(root.join(&day).join(format!(
        "{}T{:02}_counts_{}.zarr",
        day,
        forecast_hour % 24,
        variable
    )))
}

/// Load counts for every forecast hour of the request. Any missing hour
/// makes the whole request come back empty.
pub fn load_lightning(root: &Path, request: &ForecastRequest, variable: &str) -> Result<Option<GridField>> {
    let forecast_hours = request.forecast_hours();
    let mut data: Option<Array3<f32>> = None;

    for (t, &hour) in forecast_hours.iter().enumerate() {
        let path = lightning_path(root, request.run_date, hour, variable)?;
        if !path.exists() {
            info!(
                path = %path.display(),
                variable = variable,
                "Lightning counts missing, no data for request"
            );
            return Ok(None);
        }

        let counts = ArchiveReader::open(&path)?
            .read_f32()?
            .into_dimensionality::<Ix2>()
            .map_err(|e| GridReadError::invalid_request(format!("{}: {}", path.display(), e)))?;
        let dims = counts.dim();

        let grid = data.get_or_insert_with(|| Array3::from_elem((forecast_hours.len(), dims.0, dims.1), f32::NAN));
        let expected = (grid.shape()[1], grid.shape()[2]);
        if expected != dims {
            return Err(GridReadError::ShapeMismatch {
                path,
                expected,
                found: dims,
            });
        }
        grid.slice_mut(s![t, .., ..]).assign(&counts);
        debug!(path = %path.display(), hour = hour, "Read lightning counts");
    }

    Ok(data.map(|data| GridField {
        data,
        units: COUNT_UNITS.to_string(),
    }))
}
