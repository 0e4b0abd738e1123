//! Login, callback, logout and session lookup.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::error::{ApiError, ServerError};
use crate::session::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// GET /auth/google - Redirect to the Google consent screen
async fn google_login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    match state.auth.begin_login().await {
        Ok(url) => Ok(Redirect::to(&url)),
        Err(e) => {
            error!(error = %e, "failed to start login");
            Err(ApiError::internal("Failed to initialize authentication"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /auth/callback - Google redirects here after consent
async fn callback(State(state): State<AppState>, Query(params): Query<CallbackParams>) -> Response {
    let login_error = |reason: &str| {
        Redirect::to(&format!(
            "{}/login?error={}",
            state.frontend_url,
            urlencoding::encode(reason)
        ))
        .into_response()
    };

    if let Some(reason) = params.error {
        warn!(reason = %reason, "Google returned an OAuth error");
        return login_error(&reason);
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return login_error("missing_code");
    };

    let email = match state
        .auth
        .complete_login(&code, params.state.as_deref().unwrap_or_default())
        .await
    {
        Ok(email) => email,
        Err(ServerError::InvalidState) => {
            warn!("OAuth callback with unknown state");
            return login_error("invalid_state");
        }
        Err(e) => {
            error!(error = %e, "OAuth callback failed");
            return login_error("authentication_failed");
        }
    };

    let token = match state.sessions.issue(&email, &email) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "failed to issue session token");
            return login_error("authentication_failed");
        }
    };

    (
        [(header::SET_COOKIE, state.sessions.session_cookie(&token))],
        Redirect::to(&format!("{}/dashboard", state.frontend_url)),
    )
        .into_response()
}

/// POST /auth/logout - Remove stored tokens and clear the session cookie
async fn logout(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(user) = user {
        state.auth.logout(&user.email).await?;
    }

    Ok((
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    ))
}

/// GET /auth/me - The logged-in user
async fn me(user: AuthUser) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": {
            "email": user.email,
            "userId": user.user_id,
        },
    }))
}
