//! Artifact naming.
//!
//! ```text
//! {model_path}/{member}_{start}_{end}_{n}_training_examples.csv
//! {model_path}/{member}_{start}_{end}_{n}_training_scaling_values.csv
//! {model_path}/{member}_{start}_{end}_CNN_model.mpk
//! {model_path}/{member}_{start}_{end}_CNN_config.json
//! {model_path}/{member}_{start}_{end}_CNN_history.json
//! ```
//!
//! Window dates are always rendered as `YYYYMMDD`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::DateWindow;

/// Identifies the artifacts of one member's training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    pub member: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub num_examples: usize,
}

impl ArtifactKey {
    pub fn new(member: impl Into<String>, window: DateWindow, num_examples: usize) -> Self {
        Self {
            member: member.into(),
            start: window.start,
            end: window.end,
            num_examples,
        }
    }

    fn window_prefix(&self) -> String {
        format!(
            "{}_{}_{}",
            self.member,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }

    pub fn sample_manifest(&self, model_path: &Path) -> PathBuf {
        model_path.join(format!(
            "{}_{}_training_examples.csv",
            self.window_prefix(),
            self.num_examples
        ))
    }

    pub fn scaling_table(&self, model_path: &Path) -> PathBuf {
        model_path.join(format!(
            "{}_{}_training_scaling_values.csv",
            self.window_prefix(),
            self.num_examples
        ))
    }

    /// Trained weights. Not keyed by sample count.
    pub fn model_weights(&self, model_path: &Path) -> PathBuf {
        model_path.join(format!("{}_CNN_model.mpk", self.window_prefix()))
    }

    pub fn model_config(&self, model_path: &Path) -> PathBuf {
        model_path.join(format!("{}_CNN_config.json", self.window_prefix()))
    }

    /// Per-epoch loss and accuracy of the last fit.
    pub fn training_history(&self, model_path: &Path) -> PathBuf {
        model_path.join(format!("{}_CNN_history.json", self.window_prefix()))
    }
}
