//! Forecast requests: which files, which times, which variable.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{GridReadError, Result};
use crate::variable::VariableSpec;

/// Spacing between model time steps, parsed from strings like `1H`,
/// `30min`, `15T` or `1D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency(Duration);

impl Frequency {
    pub fn hours(hours: i64) -> Self {
        Self(Duration::hours(hours))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::hours(1)
    }
}

impl FromStr for Frequency {
    type Err = GridReadError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| GridReadError::invalid_request(format!("frequency '{}' has no unit", s)))?;
        let (count, unit) = s.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| GridReadError::invalid_request(format!("invalid frequency '{}'", s)))?
        };

        let duration = match unit {
            "D" | "d" => Duration::days(count),
            "H" | "h" => Duration::hours(count),
            "T" | "min" => Duration::minutes(count),
            "S" | "s" => Duration::seconds(count),
            _ => {
                return Err(GridReadError::invalid_request(format!(
                    "unsupported frequency unit '{}'",
                    unit
                )))
            }
        };

        if duration <= Duration::zero() {
            return Err(GridReadError::invalid_request(format!(
                "frequency '{}' must be positive",
                s
            )));
        }
        Ok(Self(duration))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.0.num_minutes();
        if minutes % (24 * 60) == 0 {
            write!(f, "{}D", minutes / (24 * 60))
        } else if minutes % 60 == 0 {
            write!(f, "{}H", minutes / 60)
        } else {
            write!(f, "{}min", minutes)
        }
    }
}

/// Parse a timestamp. Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH`, `YYYY-MM-DD` and `YYYYMMDD`;
/// naive times are taken as UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Some((date, hour)) = s.split_once('T') {
        if let (Ok(date), Ok(hour)) = (NaiveDate::parse_from_str(date, "%Y-%m-%d"), hour.parse::<u32>()) {
            if let Some(ndt) = date.and_hms_opt(hour, 0, 0) {
                return Ok(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    Err(GridReadError::invalid_request(format!("unrecognised date '{}'", s)))
}

/// One variable from one model run over a window of valid times.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    /// Candidate files, one per time step, in time order.
    pub files: Vec<PathBuf>,
    pub run_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub variable: VariableSpec,
    pub member: String,
    pub frequency: Frequency,
}

impl ForecastRequest {
    /// Build and validate a request.
    pub fn new(
        files: Vec<PathBuf>,
        run_date: DateTime<Utc>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        variable: VariableSpec,
        member: impl Into<String>,
        frequency: Frequency,
    ) -> Result<Self> {
        let request = Self {
            files,
            run_date,
            start_date,
            end_date,
            variable,
            member: member.into(),
            frequency,
        };
        request.validate()?;
        Ok(request)
    }

    /// `start <= end`, positive frequency, and the frequency divides the
    /// window evenly.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(GridReadError::invalid_request(format!(
                "start {} is after end {}",
                self.start_date, self.end_date
            )));
        }

        let step = self.frequency.duration();
        if step <= Duration::zero() {
            return Err(GridReadError::invalid_request("frequency must be positive"));
        }

        let window = (self.end_date - self.start_date).num_seconds();
        if window % step.num_seconds() != 0 {
            return Err(GridReadError::invalid_request(format!(
                "frequency {} does not evenly divide {} to {}",
                self.frequency, self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    /// Every valid time from start to end inclusive.
    pub fn valid_dates(&self) -> Vec<DateTime<Utc>> {
        let step = self.frequency.duration();
        let mut dates = Vec::new();
        if step <= Duration::zero() {
            return dates;
        }
        let mut current = self.start_date;
        while current <= self.end_date {
            dates.push(current);
            current += step;
        }
        dates
    }

    pub fn num_time_steps(&self) -> usize {
        self.valid_dates().len()
    }

    /// Whole hours from the run date to each valid time, rounded down.
    pub fn forecast_hours(&self) -> Vec<i64> {
        self.valid_dates()
            .iter()
            .map(|valid| (*valid - self.run_date).num_seconds().div_euclid(3600))
            .collect()
    }
}
