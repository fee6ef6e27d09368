//! Variable specifiers.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Variables served from pre-gridded lightning counts instead of GRIB2.
pub const LIGHTNING_VARIABLES: [&str; 2] = ["nldn", "entln"];

/// How a variable is addressed inside a forecast file.
///
/// Strings that are all digits select a record by its 1-based message
/// number. Anything else is a name, optionally followed by `_level`; the
/// split happens at the first underscore, so `MXUPHL_5000` is name `MXUPHL`
/// at level `5000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSpec {
    RecordId(usize),
    Name { name: String, level: Option<String> },
}

impl VariableSpec {
    pub fn record_id(id: usize) -> Self {
        Self::RecordId(id)
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            level: None,
        }
    }

    pub fn name_level(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            level: Some(level.into()),
        }
    }

    /// True for the lightning count datasets.
    pub fn is_lightning(&self) -> bool {
        matches!(self, Self::Name { name, level: None } if LIGHTNING_VARIABLES.contains(&name.as_str()))
    }
}

impl FromStr for VariableSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse() {
                return Ok(Self::RecordId(id));
            }
        }

        Ok(match s.split_once('_') {
            Some((name, level)) => Self::name_level(name, level),
            None => Self::name(s),
        })
    }
}

impl fmt::Display for VariableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordId(id) => write!(f, "{}", id),
            Self::Name { name, level: None } => write!(f, "{}", name),
            Self::Name {
                name,
                level: Some(level),
            } => write!(f, "{}_{}", name, level),
        }
    }
}
