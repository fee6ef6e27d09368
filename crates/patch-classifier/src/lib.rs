//! Storm hazard patch classification.
//!
//! Builds a class-balanced sample of labeled patches, loads the patches of
//! every configured variable, standardizes them and fits a small CNN that
//! scores each patch against four hazard classes.
//!
//! # Pipeline
//!
//! - [`PatchSampler`]: draws patch references per class from the observation
//!   labels and persists them as a manifest
//! - [`PatchLoader`]: resolves references into `[example, y, x, variable]`
//!   tensors on a worker pool
//! - [`Standardizer`]: NaN-aware z-scores with a persisted scaling table
//! - [`ClassifierTrainer`]: fits the network; [`ForecastScorer`] applies it
//!
//! [`StormModeler`] drives all of them per ensemble member.

pub mod config;
pub mod error;
pub mod forecast;
pub mod loader;
pub mod model;
pub mod modeler;
pub mod paths;
pub mod sample;
pub mod sampler;
pub mod standardize;
pub mod trainer;

/// Hazard classes scored by the network.
pub const NUM_CLASSES: usize = 4;

pub use config::{DateWindow, ModelerConfig, TrainingConfig};
pub use error::{ClassifierError, Result};
pub use forecast::{DailyForecast, ForecastScorer};
pub use loader::PatchLoader;
pub use model::{PatchCnn, PatchCnnConfig};
pub use modeler::StormModeler;
pub use paths::ArtifactKey;
pub use sample::LabeledPatch;
pub use sampler::PatchSampler;
pub use standardize::{ScalingTable, Standardizer};
pub use trainer::{ClassifierTrainer, TrainingHistory};
