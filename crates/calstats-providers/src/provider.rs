//! CalendarProvider trait definition.
//!
//! A [`CalendarProvider`] lists the raw events of one user's calendar for a
//! time window, given that user's access token. The backend holds one
//! provider for all users; tokens are passed per call.

use std::future::Future;
use std::pin::Pin;

use calstats_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core trait for calendar backends.
///
/// # Example
///
/// ```ignore
/// struct MyProvider;
///
/// impl CalendarProvider for MyProvider {
///     fn name(&self) -> &str { "mine" }
///
///     fn fetch_events<'a>(
///         &'a self,
///         access_token: &'a str,
///         window: TimeWindow,
///     ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
///         Box::pin(async move { Ok(Vec::new()) })
///     }
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the provider name (e.g., "google").
    fn name(&self) -> &str;

    /// Fetches every event overlapping `window`, authenticated as the
    /// owner of `access_token`.
    fn fetch_events<'a>(
        &'a self,
        access_token: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>>;
}
