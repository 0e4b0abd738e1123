//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date),
//! [`TimeWindow`] for defining query ranges, and [`parse_iso_datetime`] for
//! reading the ISO 8601 strings the dashboard sends.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (with timezone, stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    /// Returns the calendar date of this time as seen in `tz`.
    ///
    /// All-day dates are already calendar days and are returned unchanged.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns the weekday this time falls on in `tz`.
    pub fn weekday_in<Tz: TimeZone>(&self, tz: &Tz) -> Weekday {
        self.date_in(tz).weekday()
    }

    /// Milliseconds elapsed from `self` to `other` (negative if `other` is earlier).
    pub fn millis_until(&self, other: &EventTime) -> i64 {
        (other.to_utc_datetime() - self.to_utc_datetime()).num_milliseconds()
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
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    /// Panics if `start` is after `end`. Use [`TimeWindow::try_new`] for
    /// untrusted input.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a new time window, returning `None` if `start` is after `end`.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Parses an ISO 8601 date or datetime string into a UTC instant.
///
/// Accepted forms:
/// - RFC 3339 with offset (`2024-01-01T09:00:00+02:00`, `2024-01-01T00:00:00Z`)
/// - datetime without offset (`2024-01-01T09:00:00`, optional fraction), read as UTC
/// - bare date (`2024-01-01`), read as UTC midnight
pub fn parse_iso_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn datetime_creation() {
            let dt = utc(2025, 2, 5, 10, 30, 0);
            let et = EventTime::from_utc(dt);
            assert!(!et.is_all_day());
            assert_eq!(et, EventTime::DateTime(dt));
        }

        #[test]
        fn allday_creation() {
            let d = date(2025, 2, 5);
            let et = EventTime::from_date(d);
            assert!(et.is_all_day());
            assert_eq!(et, EventTime::AllDay(d));
        }

        #[test]
        fn to_utc_datetime() {
            let dt = utc(2025, 2, 5, 10, 30, 0);
            assert_eq!(EventTime::from_utc(dt).to_utc_datetime(), dt);
            assert_eq!(
                EventTime::from_date(date(2025, 2, 5)).to_utc_datetime(),
                utc(2025, 2, 5, 0, 0, 0)
            );
        }

        #[test]
        fn weekday_follows_timezone() {
            // Tuesday 23:30 UTC is already Wednesday at UTC+2.
            let et = EventTime::from_utc(utc(2025, 2, 4, 23, 30, 0));
            let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
            assert_eq!(et.weekday_in(&Utc), Weekday::Tue);
            assert_eq!(et.weekday_in(&plus_two), Weekday::Wed);
        }

        #[test]
        fn all_day_weekday_ignores_timezone() {
            let et = EventTime::from_date(date(2025, 2, 4));
            let minus_eight = FixedOffset::west_opt(8 * 3600).unwrap();
            assert_eq!(et.weekday_in(&Utc), Weekday::Tue);
            assert_eq!(et.weekday_in(&minus_eight), Weekday::Tue);
        }

        #[test]
        fn millis_until() {
            let start = EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0));
            let end = EventTime::from_utc(utc(2025, 2, 5, 11, 30, 0));
            assert_eq!(start.millis_until(&end), 90 * 60 * 1000);
            assert_eq!(end.millis_until(&start), -90 * 60 * 1000);
        }

        #[test]
        fn ordering() {
            let et1 = EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0));
            let et2 = EventTime::from_utc(utc(2025, 2, 5, 11, 0, 0));
            let et3 = EventTime::from_date(date(2025, 2, 5));

            assert!(et3 < et1); // midnight < 10:00
            assert!(et1 < et2);
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn creation() {
            let start = utc(2025, 2, 5, 9, 0, 0);
            let end = utc(2025, 2, 5, 17, 0, 0);
            let window = TimeWindow::new(start, end);
            assert_eq!(window.duration(), Duration::hours(8));
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_window() {
            TimeWindow::new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0));
        }

        #[test]
        fn try_new_rejects_inverted_range() {
            assert!(TimeWindow::try_new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0)).is_none());
            assert!(TimeWindow::try_new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 9, 0, 0)).is_some());
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn rfc3339_with_offset() {
            assert_eq!(
                parse_iso_datetime("2024-01-01T09:00:00+02:00"),
                Some(utc(2024, 1, 1, 7, 0, 0))
            );
            assert_eq!(
                parse_iso_datetime("2024-01-01T00:00:00Z"),
                Some(utc(2024, 1, 1, 0, 0, 0))
            );
            assert_eq!(
                parse_iso_datetime("2024-01-01T00:00:00.000Z"),
                Some(utc(2024, 1, 1, 0, 0, 0))
            );
        }

        #[test]
        fn naive_datetime_is_utc() {
            assert_eq!(
                parse_iso_datetime("2024-03-15T12:30:00"),
                Some(utc(2024, 3, 15, 12, 30, 0))
            );
        }

        #[test]
        fn bare_date_is_midnight() {
            assert_eq!(parse_iso_datetime("2024-03-15"), Some(utc(2024, 3, 15, 0, 0, 0)));
        }

        #[test]
        fn rejects_garbage() {
            assert_eq!(parse_iso_datetime(""), None);
            assert_eq!(parse_iso_datetime("not-a-date"), None);
            assert_eq!(parse_iso_datetime("2024-13-45"), None);
        }
    }
}
