//! RawEvent to NormalizedEvent conversion pipeline.
//!
//! The normalization process:
//! 1. Rejects records without an id, start or end
//! 2. Resolves start/end to [`EventTime`], synthesizing the end of all-day events
//! 3. Collects attendee emails other than the calendar owner
//! 4. Builds the final [`NormalizedEvent`]

use calstats_core::{DEFAULT_STATUS, DEFAULT_TITLE, EventTime, NormalizedEvent};
use chrono::NaiveDate;

use crate::raw_event::{RawEvent, RawEventTime};

/// Converts a [`RawEvent`] to a [`NormalizedEvent`].
///
/// Returns `None` when the record lacks an id, a start or an end. The event
/// is all-day when its start carries only a date; its end is then the
/// following date and its duration a fixed 24 hours.
pub fn normalize_event(raw: &RawEvent) -> Option<NormalizedEvent> {
    let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) else {
        tracing::debug!("dropping event without id");
        return None;
    };

    let (Some(raw_start), Some(raw_end)) = (
        raw.start.as_ref().and_then(convert_time),
        raw.end.as_ref().and_then(convert_time),
    ) else {
        tracing::debug!(event_id = id, "dropping event without start or end");
        return None;
    };

    let (start, end) = match raw_start {
        EventTime::AllDay(date) if raw.is_all_day() => {
            (raw_start, EventTime::from_date(following_day(date)))
        }
        _ => (raw_start, raw_end),
    };

    let title = raw
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let attendees = raw
        .attendees
        .iter()
        .filter(|a| !a.is_self)
        .filter_map(|a| a.email.as_deref())
        .filter(|email| !email.is_empty());

    let status = raw.status.as_deref().unwrap_or(DEFAULT_STATUS);

    Some(
        NormalizedEvent::new(id, title, start, end)
            .with_attendees(attendees)
            .with_status(status),
    )
}

/// Resolves a raw boundary, preferring the datetime over the date.
fn convert_time(raw: &RawEventTime) -> Option<EventTime> {
    match (raw.date_time, raw.date) {
        (Some(dt), _) => Some(EventTime::from_utc(dt)),
        (None, Some(date)) => Some(EventTime::from_date(date)),
        (None, None) => None,
    }
}

fn following_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// Batch normalize multiple raw events.
///
/// Cancelled events are filtered out and rejected records dropped; the
/// order of the remaining events is preserved.
pub fn normalize_events(raw_events: &[RawEvent]) -> Vec<NormalizedEvent> {
    let normalized: Vec<_> = raw_events
        .iter()
        .filter(|e| !e.is_cancelled())
        .filter_map(normalize_event)
        .collect();

    tracing::debug!(
        received = raw_events.len(),
        kept = normalized.len(),
        "normalized events"
    );

    normalized
}
