//! Sample manifests: the patch references a training run uses.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClassifierError, Result};

/// One sampled patch reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPatch {
    /// Dense row index after shuffling.
    pub index: usize,
    /// Run date as it appears in archive names.
    pub date: String,
    pub hour: usize,
    pub patch: usize,
    pub label: u8,
    /// Noise intensity; above 0.5 the loader perturbs the patch.
    pub augment: f32,
}

impl LabeledPatch {
    pub fn is_augmented(&self) -> bool {
        self.augment > 0.5
    }
}

/// Write a manifest, creating parent directories as needed.
pub fn write_manifest(path: &Path, samples: &[LabeledPatch]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| ClassifierError::csv(path, e))?;
    for sample in samples {
        writer
            .serialize(sample)
            .map_err(|e| ClassifierError::csv(path, e))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = samples.len(), "Wrote sample manifest");
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Vec<LabeledPatch>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ClassifierError::csv(path, e))?;
    let samples = reader
        .deserialize()
        .collect::<std::result::Result<Vec<LabeledPatch>, _>>()
        .map_err(|e| ClassifierError::csv(path, e))?;

    info!(path = %path.display(), rows = samples.len(), "Loaded sample manifest");
    Ok(samples)
}
