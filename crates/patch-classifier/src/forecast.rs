//! Scoring forecast patches with a trained network.

use std::path::{Path, PathBuf};

use burn::tensor::{Tensor, TensorData};
use grid_archive::{ArchiveWriter, Attributes};
use ndarray::{s, Array2, Array3, Array4, Array5, Axis};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{ClassifierError, Result};
use crate::model::PatchCnn;
use crate::paths::ArtifactKey;
use crate::standardize::ScalingTable;
use crate::trainer::{load_model, to_network_layout, InferenceBackend};
use crate::NUM_CLASSES;

/// Class scores for every patch of one run date.
#[derive(Debug, Clone)]
pub struct DailyForecast {
    pub date: String,
    /// `[hour, patch, class]`
    pub probabilities: Array3<f32>,
}

impl DailyForecast {
    /// Scores for the given classes only, `[class, hour, patch]`.
    pub fn channels(&self, classes: &[usize]) -> Result<Array3<f32>> {
        if let Some(&class) = classes.iter().find(|&&c| c >= NUM_CLASSES) {
            return Err(ClassifierError::shape(format!("class {} out of range", class)));
        }
        let (hours, patches, _) = self.probabilities.dim();
        let mut out = Array3::zeros((classes.len(), hours, patches));
        for (i, &class) in classes.iter().enumerate() {
            out.index_axis_mut(Axis(0), i)
                .assign(&self.probabilities.index_axis(Axis(2), class));
        }
        Ok(out)
    }

    /// Write the probabilities as a float32 `[hour, patch, class]` archive.
    pub fn write(&self, writer: &ArchiveWriter, dir: &Path, member: &str) -> Result<PathBuf> {
        let path = dir.join(format!("{}_{}_probabilities.zarr", member, self.date));
        let mut attrs = Attributes::new();
        attrs.insert("member".to_string(), json!(member));
        attrs.insert("date".to_string(), json!(self.date));
        attrs.insert("dimensions".to_string(), json!(["hour", "patch", "class"]));

        let data: Vec<f32> = self.probabilities.iter().copied().collect();
        writer.write_f32(&path, self.probabilities.shape(), &data, attrs)?;
        info!(path = %path.display(), "Wrote forecast probabilities");
        Ok(path)
    }
}

/// A trained network ready to score patches.
pub struct ForecastScorer {
    model: PatchCnn<InferenceBackend>,
}

impl ForecastScorer {
    pub fn new(model: PatchCnn<InferenceBackend>) -> Self {
        Self { model }
    }

    pub fn load(key: &ArtifactKey, model_path: &Path) -> Result<Self> {
        Ok(Self::new(load_model(key, model_path)?))
    }

    /// Scores `[example, class]` for a standardized `[example, y, x, variable]`
    /// tensor.
    pub fn predict(&self, data: &Array4<f32>) -> Result<Array2<f32>> {
        let (n, height, width, channels) = data.dim();
        if n == 0 {
            return Ok(Array2::zeros((0, NUM_CLASSES)));
        }
        let device = Default::default();
        let input = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(to_network_layout(data), [n, channels, height, width]),
            &device,
        );

        let scores = self
            .model
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ClassifierError::model(format!("{:?}", e)))?;
        Array2::from_shape_vec((n, NUM_CLASSES), scores).map_err(ClassifierError::shape)
    }

    /// Standardize and score every hour of a `[variable, hour, patch, y, x]`
    /// forecast.
    pub fn score_day(&self, date: &str, data: &Array5<f32>, scaling: &ScalingTable) -> Result<DailyForecast> {
        let (_, hours, patches, _, _) = data.dim();
        let mut probabilities = Array3::from_elem((hours, patches, NUM_CLASSES), f32::NAN);

        for hour in 0..hours {
            // [variable, patch, y, x] -> [patch, y, x, variable]
            let mut examples = data
                .slice(s![.., hour, .., .., ..])
                .permuted_axes([1, 2, 3, 0])
                .as_standard_layout()
                .into_owned();
            scaling.apply(examples.view_mut())?;

            let scores = self.predict(&examples)?;
            probabilities.index_axis_mut(Axis(0), hour).assign(&scores);
            debug!(date = date, hour = hour, patches = patches, "Scored hour");
        }

        Ok(DailyForecast {
            date: date.to_string(),
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection() {
        let mut probabilities = Array3::zeros((2, 3, NUM_CLASSES));
        probabilities[[1, 2, 2]] = 0.7;
        probabilities[[0, 1, 3]] = 0.4;
        let forecast = DailyForecast {
            date: "20200501".to_string(),
            probabilities,
        };

        let selected = forecast.channels(&[2, 3]).unwrap();
        assert_eq!(selected.dim(), (2, 2, 3));
        assert_eq!(selected[[0, 1, 2]], 0.7);
        assert_eq!(selected[[1, 0, 1]], 0.4);
        assert!(forecast.channels(&[4]).is_err());
    }
}
