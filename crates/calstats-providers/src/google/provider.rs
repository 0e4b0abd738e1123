//! Google Calendar implementation of [`CalendarProvider`].

use calstats_core::TimeWindow;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, CalendarProvider};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

/// Reads events from the configured Google calendar.
///
/// Stateless across users: a [`GoogleCalendarClient`] is built per call
/// from the caller's access token.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
}

impl GoogleProvider {
    /// Creates a new Google provider after validating `config`.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn fetch_events<'a>(
        &'a self,
        access_token: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            debug!(
                calendar_id = %self.config.calendar_id,
                start = %window.start,
                end = %window.end,
                "fetching Google Calendar events"
            );
            let client = GoogleCalendarClient::new(&self.config, access_token)?;
            client
                .list_events(&self.config.calendar_id, &window, None)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::OAuthCredentials;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn rejects_invalid_config() {
        let config = GoogleConfig::new(OAuthCredentials::new("bad-id", "secret"));
        assert!(GoogleProvider::new(config).is_err());
    }

    #[tokio::test]
    async fn fetches_configured_calendar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/team%40example.com/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "evt-1",
                    "start": { "date": "2025-02-05" },
                    "end": { "date": "2025-02-06" }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(
            GoogleConfig::new(credentials())
                .with_calendar_id("team@example.com")
                .with_api_base_url(server.uri()),
        )
        .unwrap();
        assert_eq!(provider.name(), "google");

        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap(),
        );
        let events = provider.fetch_events("ya29.token", window).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].calendar_id, "team@example.com");
    }
}
