//! Resolves patch references into arrays.

use std::path::PathBuf;

use grid_archive::{ArchiveReader, PatchArchiveLayout};
use ndarray::{stack, Array2, Array4, Array5, ArrayView2, Axis, Ix4};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ModelerConfig;
use crate::error::{ClassifierError, Result};
use crate::sample::LabeledPatch;

/// Noise multipliers for augmented patches, `-0.5..0.5` in steps of 0.15.
pub const NOISE_OFFSETS: [f32; 7] = [-0.5, -0.35, -0.2, -0.05, 0.1, 0.25, 0.4];

/// Population variance of the finite values; NaN when there are none.
pub fn nanvar(values: ArrayView2<f32>) -> f32 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(s, n), &v| (s + f64::from(v), n + 1));
    if count == 0 {
        return f32::NAN;
    }
    let mean = sum / count as f64;
    let ss: f64 = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum();
    (ss / count as f64) as f32
}

/// Reads patches for the configured variables.
pub struct PatchLoader {
    layout: PatchArchiveLayout,
    variables: Vec<String>,
    patch_size: usize,
    workers: usize,
    seed: u64,
}

impl PatchLoader {
    pub fn new(config: &ModelerConfig) -> Self {
        Self {
            layout: PatchArchiveLayout::new(&config.patch_path),
            variables: config.forecast_variables.clone(),
            patch_size: config.patch_size,
            workers: config.workers,
            seed: config.seed.unwrap_or_else(rand::random),
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    fn model_archive(&self, member: &str, variable: &str, date: &str) -> Result<PathBuf> {
        self.layout
            .find_model_archive(member, variable, date)?
            .ok_or_else(|| ClassifierError::MissingArchive {
                member: member.to_string(),
                variable: variable.to_string(),
                date: date.to_string(),
            })
    }

    /// Training tensor `[example, y, x, variable]`, rows in sample order.
    ///
    /// Examples are extracted on a dedicated pool of `workers` threads. The
    /// noise for augmented examples comes from an RNG seeded with the base
    /// seed plus the example index, so results do not depend on scheduling.
    pub fn load_training(&self, member: &str, samples: &[LabeledPatch]) -> Result<Array4<f32>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ClassifierError::configuration(format!("worker pool: {}", e)))?;

        info!(
            member = member,
            examples = samples.len(),
            workers = self.workers,
            "Reading training patches"
        );

        let examples: Vec<Vec<Array2<f32>>> = pool.install(|| {
            samples
                .par_iter()
                .map(|sample| self.extract_example(member, sample))
                .collect::<Result<Vec<_>>>()
        })?;

        let size = self.patch_size;
        let mut data = Array4::from_elem((samples.len(), size, size, self.variables.len()), f32::NAN);
        for (i, channels) in examples.into_iter().enumerate() {
            for (v, patch) in channels.into_iter().enumerate() {
                data.slice_mut(ndarray::s![i, .., .., v]).assign(&patch);
            }
        }
        Ok(data)
    }

    /// Every variable's patch for one reference.
    fn extract_example(&self, member: &str, sample: &LabeledPatch) -> Result<Vec<Array2<f32>>> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(sample.index as u64));
        let size = self.patch_size;

        self.variables
            .iter()
            .map(|variable| {
                let path = self.model_archive(member, variable, &sample.date)?;
                let reader = ArchiveReader::open(&path)?;
                let shape = reader.shape();
                if shape.len() != 4 || shape[2] != size || shape[3] != size {
                    return Err(ClassifierError::shape(format!(
                        "{} has shape {:?}, expected [hour, patch, {}, {}]",
                        path.display(),
                        shape,
                        size,
                        size
                    )));
                }

                let patch = reader
                    .read_f32_subset(&[sample.hour, sample.patch, 0, 0], &[1, 1, size, size])?
                    .into_shape_with_order((size, size))
                    .map_err(ClassifierError::shape)?;

                if sample.is_augmented() {
                    let offset = *NOISE_OFFSETS.choose(&mut rng).unwrap_or(&0.0);
                    let noise = nanvar(patch.view()) * offset;
                    Ok(patch.mapv(|v| v + noise))
                } else {
                    Ok(patch)
                }
            })
            .collect()
    }

    /// Whole archives for one date, `[variable, hour, patch, y, x]`.
    ///
    /// Returns `Ok(None)` when the member has no archives for the date.
    pub fn load_forecast(&self, member: &str, date: &str) -> Result<Option<Array5<f32>>> {
        if !self.layout.has_member_archives(member, date)? {
            info!(member = member, date = date, "No patch archives for date");
            return Ok(None);
        }

        let mut grids = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            let path = self.model_archive(member, variable, date)?;
            let grid = ArchiveReader::open(&path)?
                .read_f32()?
                .into_dimensionality::<Ix4>()
                .map_err(|e| ClassifierError::shape(format!("{}: {}", path.display(), e)))?;
            debug!(path = %path.display(), shape = ?grid.shape(), "Read forecast patches");
            grids.push(grid);
        }

        let views: Vec<_> = grids.iter().map(|g| g.view()).collect();
        let data = stack(Axis(0), &views).map_err(|e| {
            ClassifierError::shape(format!("variables for {} on {} disagree in shape: {}", member, date, e))
        })?;
        Ok(Some(data))
    }
}
