//! Server error types.
//!
//! [`ServerError`] is what the services return; [`ApiError`] is what the
//! HTTP layer renders as `{ "success": false, "error": ... }`.

use std::io;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use calstats_providers::ProviderError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Required settings absent at startup.
    #[error("Missing required settings: {}", settings.join(", "))]
    MissingSettings { settings: Vec<String> },

    /// SQLite failure.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    StorageTask(#[from] tokio::task::JoinError),

    /// Google OAuth or Calendar failure.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// JWT encoding failure.
    #[error("Session error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    /// No tokens stored for the user.
    #[error("User not authenticated. Please login again.")]
    NotAuthenticated,

    /// Google rejected the stored access token.
    #[error("Authentication expired. Please login again.")]
    AuthenticationExpired,

    /// The OAuth callback carried an unknown or expired state.
    #[error("Unknown or expired OAuth state")]
    InvalidState,

    /// Listing calendar events failed for a reason other than authentication.
    #[error("Failed to fetch calendar events: {message}")]
    CalendarFetch { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing-settings error.
    pub fn missing_settings<I, S>(settings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingSettings {
            settings: settings.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a calendar fetch error.
    pub fn calendar_fetch(message: impl Into<String>) -> Self {
        Self::CalendarFetch {
            message: message.into(),
        }
    }

    /// Returns true when the user has to log in again.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AuthenticationExpired)
    }
}

/// An error rendered as a JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    set_cookie: Option<HeaderValue>,
}

impl ApiError {
    /// Creates an error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            set_cookie: None,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attaches a `Set-Cookie` header, used to clear a rejected session.
    pub fn with_cookie(mut self, cookie: HeaderValue) -> Self {
        self.set_cookie = Some(cookie);
        self
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        if err.is_not_authenticated() {
            return Self::unauthorized(err.to_string());
        }
        error!(error = %err, "request failed");
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));
        let mut response = (self.status, body).into_response();
        if let Some(cookie) = self.set_cookie {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        response
    }
}
