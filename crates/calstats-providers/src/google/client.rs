//! Google Calendar API client.
//!
//! A thin HTTP client over Calendar API v3 `events.list`: request building,
//! pagination, status mapping and conversion of API items to [`RawEvent`].

use std::collections::HashSet;
use std::time::Duration;

use calstats_core::TimeWindow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::{RawAttendee, RawEvent, RawEventTime};

use super::config::GoogleConfig;

const PROVIDER: &str = "google-calendar";

/// Largest page size the Calendar API accepts.
pub const MAX_PAGE_SIZE: usize = 2500;

/// Upper bound on pages followed for one listing.
pub const MAX_PAGES: usize = 100;

/// Google Calendar API client bound to one access token.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(config: &GoogleConfig, access_token: impl Into<String>) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_provider(PROVIDER)
            })?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Lists all events of `calendar_id` overlapping `window`.
    ///
    /// Recurring events are expanded into instances and ordered by start.
    /// `max_results` is the page size (defaults to and is capped at
    /// [`MAX_PAGE_SIZE`]). Pages are followed until the API stops returning
    /// a `nextPageToken`; a repeated token or more than [`MAX_PAGES`] pages
    /// is an invalid response.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        max_results: Option<usize>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let page_size = max_results.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages == MAX_PAGES {
                return Err(ProviderError::invalid_response(format!(
                    "more than {} pages of events",
                    MAX_PAGES
                ))
                .with_provider(PROVIDER));
            }

            let page = self
                .list_events_page(calendar_id, window, page_size, page_token.as_deref())
                .await?;
            pages += 1;

            all_events.extend(
                page.items
                    .into_iter()
                    .map(|item| convert_event(item, calendar_id)),
            );

            match page.next_page_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(ProviderError::invalid_response(format!(
                        "page token '{}' repeated",
                        token
                    ))
                    .with_provider(PROVIDER));
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar_id,
            pages,
            events = all_events.len(),
            "fetched events"
        );
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
        page_size: usize,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", page_size.to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            ProviderError::network(message)
                .with_provider(PROVIDER)
                .with_source(e)
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            let mut err = ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            ))
            .with_provider(PROVIDER);
            if let Some(secs) = retry_after {
                err = err.with_retry_after(Duration::from_secs(secs));
            }
            return Err(err);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(
                ProviderError::authentication("access token expired or invalid")
                    .with_provider(PROVIDER),
            );
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(
                ProviderError::authorization("access denied to calendar").with_provider(PROVIDER),
            );
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(
                ProviderError::not_found(format!("calendar '{}' not found", calendar_id))
                    .with_provider(PROVIDER),
            );
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                ProviderError::server(format!("API error ({}): {}", status, body))
                    .with_provider(PROVIDER),
            );
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_provider(PROVIDER)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider(PROVIDER)
        })
    }
}

/// Converts a Calendar API item to a [`RawEvent`].
///
/// Nothing is rejected here: unparseable times become absent and the
/// normalizer drops the record.
fn convert_event(event: ApiEvent, calendar_id: &str) -> RawEvent {
    let id = event.id.as_deref().unwrap_or("<no id>").to_string();

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .map(|a| RawAttendee {
            email: a.email,
            is_self: a.is_self.unwrap_or(false),
        })
        .collect();

    RawEvent {
        start: event.start.map(|t| convert_time(t, &id, "start")),
        end: event.end.map(|t| convert_time(t, &id, "end")),
        id: event.id,
        summary: event.summary,
        attendees,
        status: event.status,
        calendar_id: calendar_id.to_string(),
    }
}

/// Converts one API boundary. A `dateTime` that fails to parse makes the
/// whole boundary missing, even when a `date` is also present.
fn convert_time(time: ApiEventTime, event_id: &str, which: &str) -> RawEventTime {
    if let Some(value) = time.date_time.as_deref() {
        return match DateTime::parse_from_rfc3339(value) {
            Ok(dt) => RawEventTime {
                date_time: Some(dt.with_timezone(&Utc)),
                date: time.date.as_deref().and_then(parse_date),
            },
            Err(e) => {
                warn!(event_id, which, value, "unparseable dateTime: {}", e);
                RawEventTime::default()
            }
        };
    }

    let date = time.date.as_deref().and_then(|s| {
        parse_date(s).or_else(|| {
            warn!(event_id, which, value = s, "unparseable date");
            None
        })
    });
    RawEventTime {
        date,
        date_time: None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    #[serde(rename = "self")]
    is_self: Option<bool>,
}
