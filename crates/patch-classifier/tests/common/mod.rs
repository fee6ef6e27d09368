//! Archive fixtures shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use grid_archive::{ArchiveConfig, ArchiveWriter, Attributes, PatchArchiveLayout};
use patch_classifier::{DateWindow, ModelerConfig, TrainingConfig};

pub const MEMBER: &str = "mem_1";
pub const HOURS: usize = 3;
pub const PATCHES: usize = 8;
pub const SIZE: usize = 8;
pub const VARIABLES: [&str; 2] = ["REFL", "UPHL"];

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, d).unwrap()
}

/// Value of one grid point; encodes where it came from.
pub fn patch_value(variable: usize, hour: usize, patch: usize, y: usize, x: usize) -> f32 {
    (variable * 100 + hour * 10 + patch) as f32 + (y * SIZE + x) as f32 * 0.01
}

fn writer() -> ArchiveWriter {
    ArchiveWriter::new(ArchiveConfig::uncompressed())
}

/// Patch archives for every variable of the member on `date`.
pub fn write_model_archives(root: &Path, date: &str) {
    let layout = PatchArchiveLayout::new(root);
    for (v, variable) in VARIABLES.iter().enumerate() {
        let mut data = Vec::with_capacity(HOURS * PATCHES * SIZE * SIZE);
        for hour in 0..HOURS {
            for patch in 0..PATCHES {
                for y in 0..SIZE {
                    for x in 0..SIZE {
                        data.push(patch_value(v, hour, patch, y, x));
                    }
                }
            }
        }
        writer()
            .write_f32(
                &layout.model_archive_path(MEMBER, variable, date),
                &[HOURS, PATCHES, SIZE, SIZE],
                &data,
                Attributes::new(),
            )
            .unwrap();
    }
}

/// Observation labels where patch `p` of every hour has class `p % classes`.
pub fn write_labels(root: &Path, date: &str, classes: i32) {
    let labels: Vec<i32> = (0..HOURS * PATCHES)
        .map(|i| (i % PATCHES) as i32 % classes)
        .collect();
    writer()
        .write_i32(
            &PatchArchiveLayout::new(root).label_archive_path(date),
            &[HOURS, PATCHES],
            &labels,
            Attributes::new(),
        )
        .unwrap();
}

/// A configuration over `root` with a 1-2 May training window.
pub fn config(root: &Path, num_examples: usize) -> ModelerConfig {
    let class_percentage: BTreeMap<u8, f64> = (0..4).map(|c| (c, 0.25)).collect();
    ModelerConfig {
        model_path: root.join("models"),
        patch_path: root.join("patches"),
        train: DateWindow::new(day(1), day(2)),
        forecast: Some(DateWindow::new(day(3), day(4))),
        num_examples,
        class_percentage,
        patch_size: SIZE,
        run_date_format: "%Y%m%d".to_string(),
        forecast_variables: VARIABLES.iter().map(|v| v.to_string()).collect(),
        workers: 2,
        seed: Some(42),
        training: TrainingConfig {
            epochs: 2,
            ..TrainingConfig::default()
        },
    }
}

/// Model and label archives for 1 and 2 May.
pub fn training_archives(config: &ModelerConfig) {
    for date in ["20200501", "20200502"] {
        write_model_archives(&config.patch_path, date);
        write_labels(&config.patch_path, date, 4);
    }
}
