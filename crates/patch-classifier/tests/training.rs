//! Standardization reuse and a short end-to-end fit.

mod common;

use std::fs;

use ndarray::{Array4, Axis};
use patch_classifier::{ClassifierError, ScalingTable, StormModeler, Standardizer};

use common::*;

fn variables() -> Vec<String> {
    VARIABLES.iter().map(|v| v.to_string()).collect()
}

fn ramp(offset: f32) -> Array4<f32> {
    Array4::from_shape_fn((4, 8, 8, 2), |(n, y, x, c)| {
        offset + (n * 64 + y * 8 + x) as f32 * if c == 0 { 1.0 } else { 0.5 }
    })
}

#[test]
fn test_standardizer_reuses_persisted_stats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scaling.csv");
    let standardizer = Standardizer::new(&path, variables());

    let (scaled, first) = standardizer.standardize(ramp(0.0)).unwrap();
    assert!(path.exists());
    let mean: f32 = scaled.index_axis(Axis(3), 0).mean().unwrap();
    assert!(mean.abs() < 1e-4);
    let written = fs::read(&path).unwrap();

    // Shifted data is scaled with the stored stats, not its own.
    let (scaled, second) = standardizer.standardize(ramp(100.0)).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&path).unwrap(), written);
    let mean: f32 = scaled.index_axis(Axis(3), 0).mean().unwrap();
    assert!((mean - 100.0 / first.entries[0].std as f32).abs() < 1e-3);
}

#[test]
fn test_scaling_table_variables_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scaling.csv");
    ScalingTable::compute(&ramp(0.0), &variables())
        .unwrap()
        .save(&path)
        .unwrap();

    let other = Standardizer::new(&path, vec!["REFL".to_string(), "CAPE".to_string()]);
    assert!(matches!(other.standardize(ramp(0.0)), Err(ClassifierError::Configuration(_))));
    assert!(matches!(
        Standardizer::new(dir.path().join("absent.csv"), variables()).existing(),
        Err(ClassifierError::Configuration(_))
    ));
}

#[test]
fn test_train_then_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 40);
    training_archives(&config);
    write_model_archives(&config.patch_path, "20200503");

    let modeler = StormModeler::new(config.clone()).unwrap();

    // Forecasting needs a trained model.
    assert!(modeler.create_forecasts(MEMBER).is_err());

    let history = modeler.train_models(MEMBER).unwrap();
    assert_eq!(history.epochs.len(), 2);
    let last = history.last().unwrap();
    assert!(last.loss.is_finite());
    assert!(last.val_loss.is_some());

    let key = modeler.artifact_key(MEMBER);
    assert!(key.model_weights(&config.model_path).exists());
    assert!(key.model_config(&config.model_path).exists());
    assert!(key.scaling_table(&config.model_path).exists());
    assert!(key.training_history(&config.model_path).exists());

    // Only 3 May has patches in the 3-4 May window.
    let forecasts = modeler.create_forecasts(MEMBER).unwrap();
    assert_eq!(forecasts.len(), 1);
    assert_eq!(forecasts[0].date, "20200503");
    assert_eq!(forecasts[0].probabilities.dim(), (HOURS, PATCHES, 4));
    assert!(forecasts[0]
        .probabilities
        .iter()
        .all(|p| (0.0..=1.0).contains(p)));

    let hail = forecasts[0].channels(&[2, 3]).unwrap();
    assert_eq!(hail.dim(), (2, HOURS, PATCHES));
}
