//! Hourly time ranges and the partition paths derived from them.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StormError, StormResult};

/// strftime pattern for one hourly partition, relative to the base location.
const PARTITION_FORMAT: &str = "%Y/%Y%m%d%H";

/// Suffix of every hourly partition.
const PARTITION_SUFFIX: &str = ".zarr";

/// A contiguous run of whole hours starting at midnight UTC of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyRange {
    pub start: DateTime<Utc>,
    /// Number of hours; zero or negative means an empty range.
    pub hours: i64,
}

impl HourlyRange {
    pub fn new(start: DateTime<Utc>, hours: i64) -> Self {
        Self { start, hours }
    }

    /// Parse a `YYYY-MM-DD` start date.
    pub fn parse(start: &str, hours: i64) -> StormResult<Self> {
        let date = NaiveDate::parse_from_str(start, "%Y-%m-%d").map_err(|_| {
            StormError::InvalidInput(format!(
                "start date '{}' should be in the 'YYYY-MM-DD' format",
                start
            ))
        })?;
        // chrono also accepts unpadded fields ("2009-9-20"); only the zero-padded form is valid here.
        if date.format("%Y-%m-%d").to_string() != start {
            return Err(StormError::InvalidInput(format!(
                "start date '{}' should be in the 'YYYY-MM-DD' format",
                start
            )));
        }

        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| StormError::InvalidInput(format!("invalid start date '{}'", start)))?;

        Ok(Self::new(Utc.from_utc_datetime(&midnight), hours))
    }

    /// Exclusive end of the range, `None` when it overflows the calendar.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        offset(self.start, self.hours.max(0))
    }

    pub fn len(&self) -> usize {
        self.hours.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.hours <= 0
    }

    /// Every hourly timestamp in `[start, end)`.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.hours.max(0)).map_while(move |h| offset(self.start, h))
    }

    /// Partition location for each hour, appended to `base_location`.
    pub fn partition_paths(&self, base_location: &str) -> Vec<String> {
        self.timestamps()
            .map(|ts| partition_path(base_location, &ts))
            .collect()
    }
}

fn offset(start: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|d| start.checked_add_signed(d))
}

/// Location of the partition holding the hour starting at `ts`.
///
/// Format: {base}{YYYY}/{YYYYMMDDHH}.zarr
pub fn partition_path(base_location: &str, ts: &DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        base_location,
        ts.format(PARTITION_FORMAT),
        PARTITION_SUFFIX
    )
}

/// Build the ordered list of hourly partition paths for a storm window.
pub fn generate_paths(start: &str, duration_hours: i64, base_location: &str) -> StormResult<Vec<String>> {
    Ok(HourlyRange::parse(start, duration_hours)?.partition_paths(base_location))
}
