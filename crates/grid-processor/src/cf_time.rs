//! CF-convention time decoding (`"<unit> since <reference>"`).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use storm_common::{StormError, StormResult};

/// Time unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }
}

/// A decoded `units` attribute of a CF time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse e.g. `"hours since 1970-01-01 00:00:00"`.
    pub fn parse(units: &str) -> StormResult<Self> {
        let invalid = || StormError::DatasetOpen(format!("unsupported time units '{}'", units));

        let (unit, reference) = units.split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit.trim()).ok_or_else(invalid)?;
        let reference = parse_reference(reference.trim()).ok_or_else(invalid)?;

        Ok(Self { unit, reference })
    }

    /// Timestamp for one raw axis value.
    pub fn decode(&self, value: f64) -> StormResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(StormError::DatasetOpen(format!(
                "non-finite time value {}",
                value
            )));
        }
        let millis = (value * self.unit.seconds() * 1000.0).round() as i64;
        Duration::try_milliseconds(millis)
            .and_then(|offset| self.reference.checked_add_signed(offset))
            .ok_or_else(|| {
                StormError::DatasetOpen(format!("time value {} is out of range", value))
            })
    }
}

/// Reference timestamps come in several shapes; trailing `Z` or `UTC` is
/// accepted and everything is treated as UTC.
fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let s = s
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim()
        .replace('T', " ");

    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}
