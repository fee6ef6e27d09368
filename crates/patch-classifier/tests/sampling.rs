//! Sampling and loading against on-disk archives.

mod common;

use std::fs;

use grid_archive::{ArchiveReader, PatchArchiveLayout};
use ndarray::Ix2;
use patch_classifier::{ClassifierError, PatchLoader, PatchSampler, StormModeler};

use common::*;

#[test]
fn test_second_sample_is_loaded_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 20);
    training_archives(&config);

    let sampler = PatchSampler::new(&config);
    let first = sampler.sample(MEMBER).unwrap();
    let manifest = sampler.artifact_key(MEMBER).sample_manifest(&config.model_path);
    let bytes = fs::read(&manifest).unwrap();

    // A different seed would draw differently; the manifest wins.
    let mut reseeded = config.clone();
    reseeded.seed = Some(7);
    let second = PatchSampler::new(&reseeded).sample(MEMBER).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(&manifest).unwrap(), bytes);
}

#[test]
fn test_class_targets_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 100);
    training_archives(&config);

    let samples = PatchSampler::new(&config).sample(MEMBER).unwrap();
    assert_eq!(samples.len(), 100);

    let layout = PatchArchiveLayout::new(&config.patch_path);
    for label in 0..4u8 {
        let rows: Vec<_> = samples.iter().filter(|s| s.label == label).collect();
        assert_eq!(rows.len(), 25);
        // Two qualifying dates for 25 draws.
        assert!(rows.iter().all(|s| s.is_augmented()));

        for row in rows {
            let labels = ArchiveReader::open(layout.label_archive_path(&row.date))
                .unwrap()
                .read_i32()
                .unwrap()
                .into_dimensionality::<Ix2>()
                .unwrap();
            assert_eq!(labels[[row.hour, row.patch]], i32::from(label));
        }
    }

    let indices: Vec<usize> = samples.iter().map(|s| s.index).collect();
    assert_eq!(indices, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_dates_without_labels_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 40);
    config.train.end = day(3);
    training_archives(&config);
    write_model_archives(&config.patch_path, "20200503");

    let samples = PatchSampler::new(&config).sample(MEMBER).unwrap();
    assert!(samples.iter().all(|s| s.date != "20200503"));
}

#[test]
fn test_class_without_data_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 20);
    for date in ["20200501", "20200502"] {
        write_model_archives(&config.patch_path, date);
        // classes 0-2 only
        write_labels(&config.patch_path, date, 3);
    }

    let err = PatchSampler::new(&config).sample(MEMBER).unwrap_err();
    assert!(matches!(err, ClassifierError::Configuration(_)), "{:?}", err);
}

#[test]
fn test_loader_copies_plain_patches() {
    let dir = tempfile::tempdir().unwrap();
    // One draw per class from two dates: no augmentation.
    let config = config(dir.path(), 4);
    training_archives(&config);

    let samples = StormModeler::new(config.clone()).unwrap().sample(MEMBER).unwrap();
    assert!(samples.iter().all(|s| !s.is_augmented()));

    let data = PatchLoader::new(&config).load_training(MEMBER, &samples).unwrap();
    assert_eq!(data.shape(), &[4, SIZE, SIZE, 2]);

    for (i, s) in samples.iter().enumerate() {
        for v in 0..2 {
            assert_eq!(data[[i, 0, 0, v]], patch_value(v, s.hour, s.patch, 0, 0));
            assert_eq!(data[[i, 7, 5, v]], patch_value(v, s.hour, s.patch, 7, 5));
        }
    }
}

#[test]
fn test_loader_adds_uniform_noise_to_augmented_patches() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 20);
    training_archives(&config);

    let samples = PatchSampler::new(&config).sample(MEMBER).unwrap();
    let loader = PatchLoader::new(&config);
    let data = loader.load_training(MEMBER, &samples).unwrap();

    for (i, s) in samples.iter().enumerate() {
        let offset = data[[i, 0, 0, 0]] - patch_value(0, s.hour, s.patch, 0, 0);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let shift = data[[i, y, x, 0]] - patch_value(0, s.hour, s.patch, y, x);
                assert!((shift - offset).abs() < 1e-3);
            }
        }
    }

    // Same seed, same noise.
    let again = loader.load_training(MEMBER, &samples).unwrap();
    assert_eq!(data, again);
}

#[test]
fn test_missing_variable_archive() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 4);
    training_archives(&config);
    let samples = PatchSampler::new(&config).sample(MEMBER).unwrap();

    config.forecast_variables.push("CAPE".to_string());
    let err = PatchLoader::new(&config).load_training(MEMBER, &samples).unwrap_err();
    assert!(matches!(err, ClassifierError::MissingArchive { ref variable, .. } if variable == "CAPE"));
}

#[test]
fn test_forecast_load_stacks_variables() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 4);
    write_model_archives(&config.patch_path, "20200503");

    let loader = PatchLoader::new(&config);
    let data = loader.load_forecast(MEMBER, "20200503").unwrap().unwrap();
    assert_eq!(data.shape(), &[2, HOURS, PATCHES, SIZE, SIZE]);
    assert_eq!(data[[1, 2, 5, 3, 4]], patch_value(1, 2, 5, 3, 4));

    assert!(loader.load_forecast(MEMBER, "20200504").unwrap().is_none());
}
