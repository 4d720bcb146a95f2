//! Time types and user-input parsing.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date),
//! [`TimeWindow`] for defining query ranges, and [`parse_timestamp`] for
//! normalizing the date strings users type on the command line.
//!
//! # Accepted input
//!
//! - RFC 3339 with an offset or `Z`: `2024-03-15T10:00:00+01:00`
//! - ISO-8601 without offset, read in the local time zone:
//!   `2024-03-15T10:00`, `2024-03-15 10:00:00`
//! - Date only, which resolves to [`DEFAULT_TIME_OF_DAY`] in the local time
//!   zone: `2024-03-15`

use std::cmp::Ordering;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time of day used when the user supplies only a date.
pub const DEFAULT_TIME_OF_DAY: NaiveTime = NaiveTime::MIN;

/// Offset-carrying formats that are not strict RFC 3339 (no seconds).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

/// Formats interpreted in the local time zone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Errors produced while parsing user-supplied timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The input matched none of the accepted formats.
    #[error(
        "invalid date/time '{0}': expected ISO-8601 (e.g. 2024-03-15T10:00 or \
         2024-03-15T10:00:00+01:00) or a date (YYYY-MM-DD)"
    )]
    Unrecognized(String),

    /// The input names a wall-clock time skipped by a DST transition.
    #[error("'{0}' does not exist in the local time zone")]
    NonexistentLocalTime(String),
}

/// Parses a user-supplied timestamp, resolving naive inputs in the local
/// time zone.
pub fn parse_timestamp(input: &str) -> Result<DateTime<FixedOffset>, TimeError> {
    parse_timestamp_in(input, &Local)
}

/// Parses a user-supplied timestamp, resolving naive inputs in `tz`.
///
/// Ambiguous local times (the repeated hour when clocks go back) resolve to
/// the earlier instant.
pub fn parse_timestamp_in<Tz: TimeZone>(
    input: &str,
    tz: &Tz,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Ok(dt);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return localize(naive, tz, input);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return localize(date.and_time(DEFAULT_TIME_OF_DAY), tz, input);
    }

    Err(TimeError::Unrecognized(input.to_string()))
}

fn localize<Tz: TimeZone>(
    naive: NaiveDateTime,
    tz: &Tz,
    input: &str,
) -> Result<DateTime<FixedOffset>, TimeError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| TimeError::NonexistentLocalTime(input.to_string()))
}

/// Returns the first instant of `date` in `tz`.
///
/// Zones that skip midnight on a DST day start at the first valid hour.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Returns the calendar date of this event time as seen in `tz`.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window covering a single local day.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self::new(start_of_day(date, tz), start_of_day(next, tz))
    }

    /// Creates a time window covering the Monday-to-Sunday week containing
    /// `date`.
    pub fn week_of<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let next_monday = monday + Duration::days(7);
        Self::new(start_of_day(monday, tz), start_of_day(next_monday, tz))
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}
