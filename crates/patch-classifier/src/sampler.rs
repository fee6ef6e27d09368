//! Class-balanced sampling of labeled patches.
//!
//! For every day of the training window that has both member patch archives
//! and an observation-label archive, the label grid `[hour, patch]` is split
//! by class. Hours with a single matching patch are dropped. Each class then
//! gets `floor(num_examples * percentage)` draws: a uniform date, a uniform
//! hour of that date, a uniform patch of that hour, with replacement.

use std::collections::BTreeMap;
use std::path::PathBuf;

use grid_archive::{ArchiveReader, PatchArchiveLayout};
use ndarray::Ix2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::{DateWindow, ModelerConfig};
use crate::error::{ClassifierError, Result};
use crate::paths::ArtifactKey;
use crate::sample::{read_manifest, write_manifest, LabeledPatch};
use crate::NUM_CLASSES;

/// Patch indices per hour per date for one class.
pub type ClassPool = BTreeMap<String, BTreeMap<usize, Vec<usize>>>;

/// Build (or reload) the training sample for a member.
pub struct PatchSampler {
    layout: PatchArchiveLayout,
    model_path: PathBuf,
    window: DateWindow,
    num_examples: usize,
    class_percentage: BTreeMap<u8, f64>,
    run_date_format: String,
    seed: Option<u64>,
}

impl PatchSampler {
    pub fn new(config: &ModelerConfig) -> Self {
        Self {
            layout: PatchArchiveLayout::new(&config.patch_path),
            model_path: config.model_path.clone(),
            window: config.train,
            num_examples: config.num_examples,
            class_percentage: config.class_percentage.clone(),
            run_date_format: config.run_date_format.clone(),
            seed: config.seed,
        }
    }

    pub fn artifact_key(&self, member: &str) -> ArtifactKey {
        ArtifactKey::new(member, self.window, self.num_examples)
    }

    /// The member's manifest. An existing manifest is returned as stored;
    /// otherwise a new one is drawn and persisted.
    pub fn sample(&self, member: &str) -> Result<Vec<LabeledPatch>> {
        let path = self.artifact_key(member).sample_manifest(&self.model_path);
        if path.exists() {
            info!(path = %path.display(), "Opening existing sample manifest");
            return read_manifest(&path);
        }

        let pools = self.collect_pools(member)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = draw_samples(&pools, &class_targets(self.num_examples, &self.class_percentage), &mut rng)?;

        write_manifest(&path, &samples)?;
        Ok(samples)
    }

    /// Qualifying patches of every class over the training window.
    pub fn collect_pools(&self, member: &str) -> Result<BTreeMap<u8, ClassPool>> {
        let mut pools: BTreeMap<u8, ClassPool> = BTreeMap::new();

        for day in self.window.days() {
            let date = day.format(&self.run_date_format).to_string();

            let label_path = match self.layout.find_label_archive(&date)? {
                Some(path) if self.layout.has_member_archives(member, &date)? => path,
                _ => {
                    warn!(member = member, date = %date, "Missing model or label archives, skipping date");
                    continue;
                }
            };

            let labels = ArchiveReader::open(&label_path)?
                .read_i32()?
                .into_dimensionality::<Ix2>()
                .map_err(|e| ClassifierError::shape(format!("{}: {}", label_path.display(), e)))?;

            for label in 0..NUM_CLASSES as u8 {
                let hours: BTreeMap<usize, Vec<usize>> = labels
                    .outer_iter()
                    .enumerate()
                    .filter_map(|(hour, row)| {
                        let indices: Vec<usize> = row
                            .iter()
                            .enumerate()
                            .filter(|(_, &value)| value == i32::from(label))
                            .map(|(patch, _)| patch)
                            .collect();
                        (indices.len() > 1).then_some((hour, indices))
                    })
                    .collect();

                if !hours.is_empty() {
                    pools.entry(label).or_default().insert(date.clone(), hours);
                }
            }
            debug!(date = %date, path = %label_path.display(), "Indexed labels");
        }

        Ok(pools)
    }
}

/// Draw count per class, `floor(num_examples * fraction)`.
pub fn class_targets(num_examples: usize, percentages: &BTreeMap<u8, f64>) -> Vec<(u8, usize)> {
    percentages
        .iter()
        .map(|(&label, &fraction)| (label, (num_examples as f64 * fraction).floor() as usize))
        .collect()
}

/// Draw every class's examples, shuffle them and assign dense indices.
pub fn draw_samples(
    pools: &BTreeMap<u8, ClassPool>,
    targets: &[(u8, usize)],
    rng: &mut StdRng,
) -> Result<Vec<LabeledPatch>> {
    let mut samples = Vec::with_capacity(targets.iter().map(|(_, n)| n).sum());

    for &(label, target) in targets {
        if target == 0 {
            continue;
        }
        let pool = pools.get(&label).ok_or_else(|| {
            ClassifierError::configuration(format!(
                "class {} has no qualifying dates but {} examples were requested",
                label, target
            ))
        })?;

        let dates: Vec<&String> = pool.keys().collect();
        // Too few distinct dates to expect natural variety.
        let augment = if dates.len() < target { 1.0 } else { 0.0 };

        for _ in 0..target {
            let (date, hours) = dates
                .choose(rng)
                .and_then(|date| pool.get_key_value(*date))
                .ok_or_else(|| ClassifierError::configuration(format!("class {} pool is empty", label)))?;
            let hour_keys: Vec<&usize> = hours.keys().collect();
            let hour = **hour_keys
                .choose(rng)
                .ok_or_else(|| ClassifierError::configuration(format!("no hours for {} on {}", label, date)))?;
            let patch = *hours[&hour]
                .choose(rng)
                .ok_or_else(|| ClassifierError::configuration(format!("no patches for {} on {}", label, date)))?;

            samples.push(LabeledPatch {
                index: 0,
                date: date.clone(),
                hour,
                patch,
                label,
                augment,
            });
        }
        info!(label = label, target = target, dates = dates.len(), augment = augment > 0.5, "Sampled class");
    }

    samples.shuffle(rng);
    for (index, sample) in samples.iter_mut().enumerate() {
        sample.index = index;
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(entries: &[(&str, usize, &[usize])]) -> ClassPool {
        let mut pool = ClassPool::new();
        for (date, hour, patches) in entries {
            pool.entry(date.to_string())
                .or_default()
                .insert(*hour, patches.to_vec());
        }
        pool
    }

    #[test]
    fn test_targets_floor() {
        let percentages: BTreeMap<u8, f64> = [(0, 0.33), (1, 0.33), (2, 0.33), (3, 0.01)].into_iter().collect();
        let targets = class_targets(100, &percentages);
        assert_eq!(targets, vec![(0, 33), (1, 33), (2, 33), (3, 1)]);
        assert!(targets.iter().map(|(_, n)| n).sum::<usize>() <= 100);
    }

    #[test]
    fn test_draws_come_from_pool() {
        let mut pools = BTreeMap::new();
        pools.insert(0, pool(&[("20200501", 2, &[4, 5]), ("20200502", 0, &[1, 9])]));
        pools.insert(3, pool(&[("20200502", 7, &[11, 12, 13])]));

        let mut rng = StdRng::seed_from_u64(7);
        let samples = draw_samples(&pools, &[(0, 6), (3, 4)], &mut rng).unwrap();

        assert_eq!(samples.len(), 10);
        for (i, s) in samples.iter().enumerate() {
            assert_eq!(s.index, i);
            let hours = &pools[&s.label][&s.date];
            assert!(hours[&s.hour].contains(&s.patch));
        }
        // Two dates for six draws, one date for four.
        assert!(samples.iter().all(|s| s.is_augmented()));
    }

    #[test]
    fn test_enough_dates_means_no_augmentation() {
        let mut pools = BTreeMap::new();
        pools.insert(1, pool(&[("a", 0, &[0, 1]), ("b", 0, &[0, 1]), ("c", 0, &[0, 1])]));

        let mut rng = StdRng::seed_from_u64(1);
        let samples = draw_samples(&pools, &[(1, 2)], &mut rng).unwrap();
        assert!(samples.iter().all(|s| !s.is_augmented() && s.label == 1));
    }

    #[test]
    fn test_missing_class_is_configuration_error() {
        let mut pools = BTreeMap::new();
        pools.insert(0, pool(&[("a", 0, &[0, 1])]));
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            draw_samples(&pools, &[(0, 1), (2, 1)], &mut rng),
            Err(ClassifierError::Configuration(_))
        ));
        // A zero target never looks at the pool.
        assert!(draw_samples(&pools, &[(0, 1), (2, 0)], &mut rng).is_ok());
    }
}
