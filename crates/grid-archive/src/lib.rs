//! Zarr V3 archives on the local filesystem.
//!
//! Stores the gridded artifacts the modelling pipeline exchanges:
//!
//! - model patches, `[hour, patch, y, x]` float32 per member/variable/date
//! - observation labels, `[hour, patch]` int32 per date
//! - pre-gridded lightning counts, `[y, x]` float32 per hour
//!
//! Each archive holds a single array at the store root, written with
//! [`ArchiveWriter`] and read back as `ndarray` arrays with
//! [`ArchiveReader`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use config::{ArchiveCompression, ArchiveConfig};
pub use discovery::{find_archive, find_archives};
pub use error::{ArchiveError, Result};
pub use layout::PatchArchiveLayout;
pub use reader::ArchiveReader;
pub use writer::{ArchiveWriter, Attributes};
