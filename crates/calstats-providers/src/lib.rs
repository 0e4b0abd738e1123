//! Calendar provider plumbing: raw records, normalization, Google clients.
//!
//! - [`RawEvent`] - Provider event records before normalization
//! - [`normalize_event`] - Converts raw records to [`NormalizedEvent`](calstats_core::NormalizedEvent)
//! - [`CalendarProvider`] - The trait the backend fetches events through
//! - [`google`] - OAuth and Calendar API clients
//! - [`ProviderError`] - Error types for provider operations
//!
//! ```text
//! Google Calendar API ──► GoogleProvider ──► RawEvent ──► normalize_events() ──► NormalizedEvent
//! ```

pub mod error;
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_event;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{normalize_event, normalize_events};
pub use provider::{BoxFuture, CalendarProvider};
pub use raw_event::{RawAttendee, RawEvent, RawEventTime};
