//! Raw event records as returned by the calendar provider.
//!
//! [`RawEvent`] mirrors the provider's record shape before normalization.
//! Every field that the provider may omit is optional here, so a record with
//! missing data survives parsing and is rejected later by
//! [`normalize_event`](crate::normalize::normalize_event).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The start or end of a raw event.
///
/// Timed events carry `date_time`; all-day events carry only `date`. A
/// record with neither is treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventTime {
    /// Calendar date of an all-day event.
    pub date: Option<NaiveDate>,
    /// Instant of a timed event.
    pub date_time: Option<DateTime<Utc>>,
}

impl RawEventTime {
    /// Creates a timed event boundary.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(dt),
            ..Self::default()
        }
    }

    /// Creates an all-day event boundary.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    /// Returns true if only a date is present.
    pub fn is_all_day(&self) -> bool {
        self.date.is_some() && self.date_time.is_none()
    }

    /// Returns true if neither a date nor a datetime is present.
    pub fn is_missing(&self) -> bool {
        self.date.is_none() && self.date_time.is_none()
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    /// The attendee's email address. Resources and some groups have none.
    pub email: Option<String>,
    /// Whether this entry is the calendar owner.
    pub is_self: bool,
}

impl RawAttendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Creates the attendee entry for the calendar owner.
    pub fn owner(email: impl Into<String>) -> Self {
        Self {
            is_self: true,
            ..Self::new(email)
        }
    }
}

/// A raw calendar event from the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider-assigned identifier.
    pub id: Option<String>,
    /// The event title.
    pub summary: Option<String>,
    /// When the event starts.
    pub start: Option<RawEventTime>,
    /// When the event ends.
    pub end: Option<RawEventTime>,
    /// Event attendees, including the owner when invited.
    pub attendees: Vec<RawAttendee>,
    /// Provider status ("confirmed", "tentative", "cancelled").
    pub status: Option<String>,
    /// The calendar this event was listed from.
    pub calendar_id: String,
}

impl RawEvent {
    /// Creates a new raw event with an id and both boundaries.
    pub fn new(
        id: impl Into<String>,
        start: RawEventTime,
        end: RawEventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            start: Some(start),
            end: Some(end),
            calendar_id: calendar_id.into(),
            ..Self::default()
        }
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    /// Returns true if the start is date-only.
    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(RawEventTime::is_all_day)
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datetime() -> DateTime<Utc> {
        "2025-02-05T10:00:00Z".parse().unwrap()
    }

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
    }

    #[test]
    fn event_time_kinds() {
        assert!(!RawEventTime::from_datetime(sample_datetime()).is_all_day());
        assert!(RawEventTime::from_date(sample_date()).is_all_day());
        assert!(RawEventTime::default().is_missing());

        // A datetime wins over a date when both are present.
        let both = RawEventTime {
            date: Some(sample_date()),
            date_time: Some(sample_datetime()),
        };
        assert!(!both.is_all_day());
        assert!(!both.is_missing());
    }

    #[test]
    fn cancelled_is_case_insensitive() {
        let start = RawEventTime::from_datetime(sample_datetime());
        let end = RawEventTime::from_datetime(sample_datetime());
        let event = RawEvent::new("evt-1", start, end, "primary");

        assert!(!event.is_cancelled());
        assert!(event.clone().with_status("cancelled").is_cancelled());
        assert!(event.clone().with_status("CANCELLED").is_cancelled());
        assert!(!event.with_status("confirmed").is_cancelled());
    }

    #[test]
    fn all_day_follows_start() {
        let event = RawEvent::new(
            "evt-2",
            RawEventTime::from_date(sample_date()),
            RawEventTime::from_date(sample_date().succ_opt().unwrap()),
            "primary",
        );
        assert!(event.is_all_day());
        assert!(!RawEvent::default().is_all_day());
    }

    #[test]
    fn attendee_constructors() {
        let guest = RawAttendee::new("guest@example.com");
        assert_eq!(guest.email.as_deref(), Some("guest@example.com"));
        assert!(!guest.is_self);

        let owner = RawAttendee::owner("me@example.com");
        assert!(owner.is_self);
    }
}
