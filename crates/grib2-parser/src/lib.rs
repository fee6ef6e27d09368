//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Parses GRIB2 files into messages, builds a keyed record index over them
//! and decodes field values. Simple packing is decoded in-crate; other
//! packing templates go through the `grib` crate.

pub mod error;
pub mod index;
pub mod reader;
pub mod sections;
pub mod tables;
pub mod unpacking;

pub use error::{Grib2Error, Result};
pub use index::{Grib2Index, RecordKey, RecordMeta};
pub use reader::{Grib2Message, Grib2Reader};
pub use tables::{Grib2Tables, ParameterInfo, UNKNOWN};
