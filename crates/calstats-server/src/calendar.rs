//! Fetches and normalizes a user's calendar events.

use std::sync::Arc;

use calstats_core::{NormalizedEvent, TimeWindow};
use calstats_providers::{CalendarProvider, normalize_events};
use tracing::{debug, warn};

use crate::auth::AuthService;
use crate::error::{ServerError, ServerResult};

/// Lists events through a [`CalendarProvider`] with the user's stored token.
pub struct CalendarService {
    provider: Arc<dyn CalendarProvider>,
}

impl CalendarService {
    /// Creates the service around `provider`.
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self { provider }
    }

    /// Returns the normalized events of `email` overlapping `window`.
    pub async fn fetch_calendar_events(
        &self,
        auth: &AuthService,
        email: &str,
        window: TimeWindow,
    ) -> ServerResult<Vec<NormalizedEvent>> {
        let access_token = auth
            .access_token_for(email)
            .await?
            .ok_or(ServerError::NotAuthenticated)?;

        let raw = self
            .provider
            .fetch_events(&access_token, window)
            .await
            .map_err(|e| {
                warn!(email, provider = self.provider.name(), error = %e, "calendar fetch failed");
                if e.is_authentication() {
                    ServerError::AuthenticationExpired
                } else {
                    ServerError::calendar_fetch(e.message())
                }
            })?;

        let events = normalize_events(&raw);
        debug!(email, fetched = raw.len(), normalized = events.len(), "fetched calendar events");
        Ok(events)
    }
}
