//! Storage diagnostics.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::StorageMode;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/debug/storage", get(storage))
}

/// GET /api/debug/storage - Which backend holds tokens, and how many
async fn storage(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let info = state.tokens.info().await.map_err(|e| {
        error!(error = %e, "failed to read storage info");
        ApiError::internal("Failed to get storage info")
    })?;

    let note = match info.mode {
        StorageMode::InMemory => "Data is in RAM. Restart clears it.",
        StorageMode::Sqlite => "Data persists in SQLite.",
    };

    Ok(Json(json!({
        "success": true,
        "storage": info,
        "note": note,
    })))
}
