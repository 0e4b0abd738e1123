//! Core types: event times, normalized events, statistics, formatting

pub mod event;
pub mod format;
pub mod stats;
pub mod time;
pub mod tracing;

pub use event::{ALL_DAY_DURATION_MS, DEFAULT_STATUS, DEFAULT_TITLE, NormalizedEvent};
pub use format::format_duration;
pub use stats::{BusiestDay, CalendarStats, aggregate_stats, aggregate_stats_in, weekday_name};
pub use time::{EventTime, TimeWindow, parse_iso_datetime};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
