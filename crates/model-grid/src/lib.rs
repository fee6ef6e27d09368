//! Forecast grid reading.
//!
//! Reads one variable from every file of a model run and stacks the layers
//! into a `(time, y, x)` array. Variables are addressed by message number,
//! by name, or by `name_level`; NCEP local-use records that generic tables
//! cannot name are resolved through a built-in table. Lightning counts
//! (`nldn`, `entln`) come from pre-gridded archives instead of GRIB2.
//!
//! ```ignore
//! let request = ForecastRequest::new(files, run, start, end, "MAXREF".parse()?, "mem_1", Frequency::hours(1))?;
//! if let Some(field) = GridReader::new(request).load_data()? {
//!     println!("{:?} {}", field.data.shape(), field.units);
//! }
//! ```

pub mod error;
pub mod lightning;
pub mod reader;
pub mod request;
pub mod resolve;
pub mod unknown;
pub mod variable;

pub use error::{GridReadError, Result};
pub use lightning::{lightning_path, COUNT_UNITS};
pub use reader::{GridField, GridReader, DEFAULT_LIGHTNING_ROOT};
pub use request::{parse_datetime, ForecastRequest, Frequency};
pub use resolve::{resolve_layer, ResolvedLayer};
pub use unknown::{UnknownRecord, UNKNOWN_RECORDS};
pub use variable::{VariableSpec, LIGHTNING_VARIABLES};
