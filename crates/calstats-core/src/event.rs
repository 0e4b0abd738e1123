//! Normalized calendar events.
//!
//! [`NormalizedEvent`] is the provider-agnostic shape every fetched event is
//! converted to before statistics are computed or events are persisted.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Placeholder title for events without a summary.
pub const DEFAULT_TITLE: &str = "No Title";

/// Status reported for events when the provider gives none.
pub const DEFAULT_STATUS: &str = "confirmed";

/// Duration counted for every all-day event, regardless of its date span.
pub const ALL_DAY_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

/// A normalized calendar event from any provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Unique identifier for the event (provider-specific).
    pub id: String,
    /// The event title/summary.
    pub title: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Event length in milliseconds. May be zero or negative when the
    /// provider reports an inverted range.
    pub duration_ms: i64,
    /// Emails of attendees other than the calendar owner, in first-seen order.
    pub attendee_emails: Vec<String>,
    /// Whether the event is date-only.
    pub is_all_day: bool,
    /// Provider status string.
    pub status: String,
}

impl NormalizedEvent {
    /// Creates a new event, deriving the all-day flag and duration from the times.
    ///
    /// All-day events always last [`ALL_DAY_DURATION_MS`].
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        let is_all_day = start.is_all_day();
        let duration_ms = if is_all_day {
            ALL_DAY_DURATION_MS
        } else {
            start.millis_until(&end)
        };

        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            duration_ms,
            attendee_emails: Vec::new(),
            is_all_day,
            status: DEFAULT_STATUS.to_string(),
        }
    }

    /// Returns true when nobody besides the owner attends.
    pub fn is_solo(&self) -> bool {
        self.attendee_emails.is_empty()
    }

    /// Builder method to set attendee emails.
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn with_attendees<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendee_emails.clear();
        for email in emails {
            let email = email.into();
            if !self.attendee_emails.contains(&email) {
                self.attendee_emails.push(email);
            }
        }
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Builder method to override the duration.
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
