//! Pipeline configuration.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::NUM_CLASSES;

/// An inclusive range of run dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Every calendar day from start to end inclusive.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|day| *day <= self.end)
            .collect()
    }
}

/// Optimizer and schedule settings for the CNN.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Fraction of examples, taken from the end, held out for validation.
    pub validation_split: f64,
    /// L2 weight on the convolution kernels.
    pub l2: f64,
    /// Batch size is `examples / batch_divisor`, at least 1.
    pub batch_divisor: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            learning_rate: 1e-3,
            validation_split: 0.1,
            l2: 0.001,
            batch_divisor: 30,
        }
    }
}

impl TrainingConfig {
    pub fn batch_size(&self, examples: usize) -> usize {
        (examples / self.batch_divisor.max(1)).max(1)
    }
}

/// Everything the modeler needs to sample, train and forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelerConfig {
    /// Directory for manifests, scaling tables and trained models.
    pub model_path: PathBuf,

    /// Root of the patch and label archives.
    pub patch_path: PathBuf,

    pub train: DateWindow,

    #[serde(default)]
    pub forecast: Option<DateWindow>,

    /// Total examples to sample.
    pub num_examples: usize,

    /// Fraction of `num_examples` drawn from each class label.
    pub class_percentage: BTreeMap<u8, f64>,

    /// Edge length of the square patches.
    pub patch_size: usize,

    /// strftime format of dates in archive names.
    #[serde(default = "default_run_date_format")]
    pub run_date_format: String,

    /// Variables loaded as channels, in channel order.
    pub forecast_variables: Vec<String>,

    /// Threads used for training patch extraction.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Seed for sampling, augmentation noise and weight init. Unseeded runs
    /// draw from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub training: TrainingConfig,
}

fn default_run_date_format() -> String {
    "%Y%m%d".to_string()
}

fn default_workers() -> usize {
    4
}

impl ModelerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ClassifierError::configuration(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply path and worker overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = env::var("HAILCAST_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("HAILCAST_PATCH_PATH") {
            self.patch_path = PathBuf::from(path);
        }
        if let Some(workers) = env::var("HAILCAST_WORKERS").ok().and_then(|v| v.parse().ok()) {
            self.workers = workers;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.train.start > self.train.end {
            return Err(ClassifierError::configuration(format!(
                "training window starts {} after it ends {}",
                self.train.start, self.train.end
            )));
        }
        if let Some(forecast) = &self.forecast {
            if forecast.start > forecast.end {
                return Err(ClassifierError::configuration(format!(
                    "forecast window starts {} after it ends {}",
                    forecast.start, forecast.end
                )));
            }
        }
        if self.forecast_variables.is_empty() {
            return Err(ClassifierError::configuration("no forecast variables configured"));
        }
        if self.patch_size < 8 {
            return Err(ClassifierError::configuration(format!(
                "patch size {} is too small for three pooling stages (minimum 8)",
                self.patch_size
            )));
        }
        if self.workers == 0 {
            return Err(ClassifierError::configuration("workers must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.training.validation_split) {
            return Err(ClassifierError::configuration(format!(
                "validation split {} must be in [0, 1)",
                self.training.validation_split
            )));
        }
        validate_percentages(&self.class_percentage)
    }
}

/// Class keys must be labels, fractions must be in [0, 1] and sum to at
/// most one.
pub fn validate_percentages(percentages: &BTreeMap<u8, f64>) -> Result<()> {
    if percentages.is_empty() {
        return Err(ClassifierError::configuration("no class percentages configured"));
    }
    for (&label, &fraction) in percentages {
        if usize::from(label) >= NUM_CLASSES {
            return Err(ClassifierError::configuration(format!(
                "class label {} is outside 0..{}",
                label, NUM_CLASSES
            )));
        }
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ClassifierError::configuration(format!(
                "class {} percentage {} is outside [0, 1]",
                label, fraction
            )));
        }
    }

    let total: f64 = percentages.values().sum();
    if total > 1.0 + 1e-6 {
        return Err(ClassifierError::configuration(format!(
            "class percentages sum to {}",
            total
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
model_path: /tmp/models
patch_path: /tmp/patches
train:
  start: 2020-05-01
  end: 2020-05-03
num_examples: 100
class_percentage:
  0: 0.4
  1: 0.3
  2: 0.2
  3: 0.1
patch_size: 16
forecast_variables: [REFL_COM_max, UP_HELI_MAX]
"#;

    #[test]
    fn test_defaults() {
        let config = ModelerConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.run_date_format, "%Y%m%d");
        assert_eq!(config.workers, 4);
        assert_eq!(config.training.epochs, 30);
        assert_eq!(config.training.batch_size(100), 3);
        assert_eq!(config.training.batch_size(10), 1);
        assert!(config.forecast.is_none());
        assert_eq!(config.train.days().len(), 3);
    }

    #[test]
    fn test_percentages() {
        let mut p: BTreeMap<u8, f64> = [(0, 0.5), (1, 0.5)].into_iter().collect();
        assert!(validate_percentages(&p).is_ok());

        p.insert(2, 0.1);
        assert!(validate_percentages(&p).is_err());

        let p: BTreeMap<u8, f64> = [(4, 0.1)].into_iter().collect();
        assert!(validate_percentages(&p).is_err());

        let p: BTreeMap<u8, f64> = [(0, -0.1)].into_iter().collect();
        assert!(validate_percentages(&p).is_err());
    }

    #[test]
    fn test_small_patches_rejected() {
        let yaml = YAML.replace("patch_size: 16", "patch_size: 4");
        assert!(matches!(
            ModelerConfig::from_yaml(&yaml),
            Err(ClassifierError::Configuration(_))
        ));
    }
}
