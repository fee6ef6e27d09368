//! Record index over a GRIB2 file.
//!
//! Every message in a file is parsed once into a [`RecordMeta`] carrying the
//! keys grid readers select on (parameter number, short/long name, level
//! type, numeric level, level label). Selection works like a keyed index
//! query: all keys must match, and an empty result is an error.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Grib2Error, Result};
use crate::reader::{Grib2Message, Grib2Reader};
use crate::tables::{self, Grib2Tables};

/// Index metadata for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    /// 1-based position of the message in the file.
    pub number: usize,
    pub discipline: u8,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub short_name: String,
    pub name: String,
    pub units: String,
    /// ecCodes-style level type, e.g. `isobaricInhPa`.
    pub type_of_level: String,
    /// Value of the first fixed surface.
    pub level: i64,
    /// `"500"`, or `"5000-2000"` for layers.
    pub level_label: String,
    pub forecast_hour: u32,
}

impl RecordMeta {
    fn from_message(number: usize, message: &Grib2Message, tables: &Grib2Tables) -> Self {
        let param = message.parameter(tables);
        let pd = &message.product_definition;
        let first = pd.first_surface;

        let level_label = match pd.second_surface {
            Some(second) => format!("{}-{}", format_level(first.value), format_level(second.value)),
            None => format_level(first.value),
        };

        Self {
            number,
            discipline: message.discipline(),
            parameter_category: pd.parameter_category,
            parameter_number: pd.parameter_number,
            short_name: param.short_name,
            name: param.name,
            units: param.units,
            type_of_level: tables::type_of_level(first.surface_type, pd.second_surface.is_some())
                .to_string(),
            level: first.value.round() as i64,
            level_label,
            forecast_hour: pd.forecast_hour,
        }
    }
}

impl fmt::Display for RecordMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({}):{}:level {}:fcst time {} hrs",
            self.number,
            self.name,
            self.short_name,
            self.units,
            self.type_of_level,
            self.level_label,
            self.forecast_hour
        )
    }
}

fn format_level(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// A key to select records on.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    ParameterNumber(u8),
    ShortName(String),
    /// Long name, e.g. "Temperature".
    LongName(String),
    /// Either the short or the long name.
    Name(String),
    TypeOfLevel(String),
    Level(i64),
    LevelLabel(String),
}

impl RecordKey {
    pub fn matches(&self, record: &RecordMeta) -> bool {
        match self {
            RecordKey::ParameterNumber(n) => record.parameter_number == *n,
            RecordKey::ShortName(name) => record.short_name == *name,
            RecordKey::LongName(name) => record.name == *name,
            RecordKey::Name(name) => record.short_name == *name || record.name == *name,
            RecordKey::TypeOfLevel(level) => record.type_of_level == *level,
            RecordKey::Level(level) => record.level == *level,
            RecordKey::LevelLabel(label) => record.level_label == *label,
        }
    }
}

/// Parsed messages of one GRIB2 file plus their index records.
pub struct Grib2Index {
    messages: Vec<Grib2Message>,
    records: Vec<RecordMeta>,
}

impl Grib2Index {
    /// Read and index a file with the shared parameter tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_tables(path, Grib2Tables::shared())
    }

    pub fn open_with_tables(path: impl AsRef<Path>, tables: Arc<Grib2Tables>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = data.len(), "Indexing GRIB2 file");
        Self::from_bytes(Bytes::from(data), &tables)
    }

    pub fn from_bytes(data: Bytes, tables: &Grib2Tables) -> Result<Self> {
        let messages = Grib2Reader::new(data).read_all()?;
        let records = messages
            .iter()
            .enumerate()
            .map(|(i, message)| RecordMeta::from_message(i + 1, message, tables))
            .collect();

        Ok(Self { messages, records })
    }

    pub fn records(&self) -> &[RecordMeta] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for a 1-based message number.
    pub fn record(&self, number: usize) -> Result<&RecordMeta> {
        number
            .checked_sub(1)
            .and_then(|i| self.records.get(i))
            .ok_or_else(|| {
                Grib2Error::NoMatch(format!(
                    "message number {} (file has {} messages)",
                    number,
                    self.records.len()
                ))
            })
    }

    /// Message for a 1-based message number.
    pub fn message(&self, number: usize) -> Result<&Grib2Message> {
        self.record(number)?;
        Ok(&self.messages[number - 1])
    }

    /// Records matching every key, in file order.
    pub fn select(&self, keys: &[RecordKey]) -> Result<Vec<&RecordMeta>> {
        let selected: Vec<&RecordMeta> = self
            .records
            .iter()
            .filter(|record| keys.iter().all(|key| key.matches(record)))
            .collect();

        if selected.is_empty() {
            return Err(Grib2Error::NoMatch(format!("{:?}", keys)));
        }
        Ok(selected)
    }

    /// Decoded values of a record.
    pub fn values(&self, record: &RecordMeta) -> Result<Vec<f32>> {
        self.message(record.number)?.unpack_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(short_name: &str, type_of_level: &str, level: i64, label: &str) -> RecordMeta {
        RecordMeta {
            number: 1,
            discipline: 0,
            parameter_category: 0,
            parameter_number: 0,
            short_name: short_name.to_string(),
            name: "Temperature".to_string(),
            units: "K".to_string(),
            type_of_level: type_of_level.to_string(),
            level,
            level_label: label.to_string(),
            forecast_hour: 0,
        }
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(500.0), "500");
        assert_eq!(format_level(0.5), "0.5");
    }

    #[test]
    fn test_name_key_matches_short_or_long() {
        let rec = record("TMP", "isobaricInhPa", 500, "500");
        assert!(RecordKey::Name("TMP".into()).matches(&rec));
        assert!(RecordKey::Name("Temperature".into()).matches(&rec));
        assert!(!RecordKey::ShortName("Temperature".into()).matches(&rec));
        assert!(RecordKey::LongName("Temperature".into()).matches(&rec));
    }

    #[test]
    fn test_level_keys() {
        let rec = record("TMP", "heightAboveGroundLayer", 5000, "5000-2000");
        assert!(RecordKey::Level(5000).matches(&rec));
        assert!(RecordKey::LevelLabel("5000-2000".into()).matches(&rec));
        assert!(!RecordKey::TypeOfLevel("5000".into()).matches(&rec));
    }

    #[test]
    fn test_display() {
        let rec = record("TMP", "isobaricInhPa", 500, "500");
        assert_eq!(
            rec.to_string(),
            "1:Temperature:TMP (K):isobaricInhPa:level 500:fcst time 0 hrs"
        );
    }
}
