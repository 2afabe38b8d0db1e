//! Half-open time windows in epoch milliseconds.
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::WINDOW_DAYS;
use crate::error::GenerationError;

/// `[start, end)` interval in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] unless `start < end`.
    pub fn new(start: i64, end: i64) -> Result<Self, GenerationError> {
        if start >= end {
            return Err(GenerationError::Config(format!(
                "window start {start} must precede end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] unless `start < end`.
    pub fn from_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, GenerationError> {
        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    /// The week starting at the first Monday 00:00 UTC strictly after `now`.
    #[must_use]
    pub fn next_week(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let days_until = 7 - i64::from(today.weekday().num_days_from_monday());
        let monday = today + Duration::days(days_until);
        let start = midnight_millis(monday);
        Self {
            start,
            end: start + Duration::days(WINDOW_DAYS).num_milliseconds(),
        }
    }

    /// The window of `days` length ending where this one starts.
    #[must_use]
    pub fn preceding(&self, days: i64) -> Self {
        Self {
            start: self.start - Duration::days(days).num_milliseconds(),
            end: self.start,
        }
    }

    #[must_use]
    pub const fn contains(&self, instant: i64) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Human-readable bounds for log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        let fmt = |ms: i64| {
            DateTime::<Utc>::from_timestamp_millis(ms)
                .map_or_else(|| ms.to_string(), |dt| dt.format("%d/%m/%Y %H:%M:%S UTC").to_string())
        };
        format!("{} - {}", fmt(self.start), fmt(self.end))
    }
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date (midnight UTC).
///
/// # Errors
///
/// Returns [`GenerationError::Config`] if neither form matches.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, GenerationError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| DateTime::<Utc>::from_timestamp_millis(midnight_millis(date)))
        .ok_or_else(|| GenerationError::Config(format!("unrecognized date {raw:?}")))
}

fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |naive| naive.and_utc().timestamp_millis())
}
