//! On-disk naming of patch and label archives.
//!
//! ```text
//! {root}/{member}/{member}_{variable}_{date}_patches.zarr   float32 [hour, patch, y, x]
//! {root}/obs_labels_{date}.zarr                             int32   [hour, patch]
//! ```
//!
//! Lookups only rely on fragments (`*{variable}*{date}*` within the member
//! directory, `*obs*{date}*` at the root), so archives produced by other
//! tools are found as long as their names carry those pieces.

use std::path::{Path, PathBuf};

use crate::discovery::find_archive;
use crate::error::Result;

/// Name fragment that marks observation-label archives.
pub const OBS_FRAGMENT: &str = "obs";

/// Archive locations under a patch root directory.
#[derive(Debug, Clone)]
pub struct PatchArchiveLayout {
    root: PathBuf,
}

impl PatchArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn member_dir(&self, member: &str) -> PathBuf {
        self.root.join(member)
    }

    /// Canonical path for a new model-patch archive.
    pub fn model_archive_path(&self, member: &str, variable: &str, date: &str) -> PathBuf {
        self.member_dir(member)
            .join(format!("{}_{}_{}_patches.zarr", member, variable, date))
    }

    /// Canonical path for a new observation-label archive.
    pub fn label_archive_path(&self, date: &str) -> PathBuf {
        self.root
            .join(format!("{}_labels_{}.zarr", OBS_FRAGMENT, date))
    }

    /// Whether any model-patch archive exists for the member and date.
    pub fn has_member_archives(&self, member: &str, date: &str) -> Result<bool> {
        Ok(find_archive(&self.member_dir(member), &[date])?.is_some())
    }

    pub fn find_model_archive(
        &self,
        member: &str,
        variable: &str,
        date: &str,
    ) -> Result<Option<PathBuf>> {
        find_archive(&self.member_dir(member), &[variable, date])
    }

    pub fn find_label_archive(&self, date: &str) -> Result<Option<PathBuf>> {
        find_archive(&self.root, &[OBS_FRAGMENT, date])
    }
}
