//! Calendar statistics endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use calstats_core::{CalendarStats, TimeWindow, parse_iso_datetime};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::session::AuthUser;
use crate::state::AppState;

/// Longest range a single stats request may cover.
const MAX_RANGE_DAYS: i64 = 365;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/calendar/stats", get(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    success: bool,
    data: CalendarStats,
    meta: StatsMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsMeta {
    date_range: DateRange,
    events_processed: usize,
    events_saved_to_db: usize,
}

#[derive(Debug, Serialize)]
struct DateRange {
    start: String,
    end: String,
}

/// Checks the query parameters and turns them into a window.
fn validate_range(start: Option<&str>, end: Option<&str>) -> Result<TimeWindow, ApiError> {
    let (Some(start), Some(end)) = (
        start.filter(|s| !s.is_empty()),
        end.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "startDate and endDate query parameters are required",
        ));
    };

    let (Some(start), Some(end)) = (parse_iso_datetime(start), parse_iso_datetime(end)) else {
        return Err(ApiError::bad_request(
            "Invalid date format. Use ISO 8601 format (e.g., 2024-01-01T00:00:00Z)",
        ));
    };

    let Some(window) = TimeWindow::try_new(start, end) else {
        return Err(ApiError::bad_request("startDate must be before endDate"));
    };

    if window.duration() > Duration::days(MAX_RANGE_DAYS) {
        return Err(ApiError::bad_request("Date range cannot exceed 365 days"));
    }
    Ok(window)
}

/// GET /api/calendar/stats?startDate=..&endDate=..
async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let window = validate_range(query.start_date.as_deref(), query.end_date.as_deref())?;

    let events = state
        .calendar
        .fetch_calendar_events(&state.auth, &user.email, window)
        .await?;

    let saved = match &state.events {
        Some(store) => store
            .save_events(&user.email, &events)
            .await
            .unwrap_or_else(|e| {
                warn!(email = %user.email, error = %e, "could not save events");
                0
            }),
        None => 0,
    };

    let data = state.aggregate(&events);
    info!(
        email = %user.email,
        events = events.len(),
        saved,
        "computed calendar stats"
    );

    Ok(Json(StatsResponse {
        success: true,
        data,
        meta: StatsMeta {
            date_range: DateRange {
                start: query.start_date.unwrap_or_default(),
                end: query.end_date.unwrap_or_default(),
            },
            events_processed: events.len(),
            events_saved_to_db: saved,
        },
    }))
}
