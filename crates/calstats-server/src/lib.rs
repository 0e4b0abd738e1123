//! HTTP backend for calendar statistics.
//!
//! This crate provides the calstats server that handles:
//! - Google sign-in (OAuth 2.0 with PKCE) and JWT session cookies
//! - OAuth token storage, in memory or in SQLite
//! - The `/api/calendar/stats` endpoint that fetches, normalizes and
//!   aggregates a user's events
//!
//! # Example
//!
//! ```rust,no_run
//! use calstats_server::{AppState, ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::load()?;
//!     config.validate()?;
//!     let state = AppState::new(&config)?;
//!     serve(&config, state).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod pending;
pub mod routes;
pub mod session;
pub mod signals;
pub mod state;
pub mod storage;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use auth::AuthService;
pub use calendar::CalendarService;
pub use config::{ServerConfig, StatsTimezone, parse_lifetime};
pub use error::{ApiError, ServerError, ServerResult};
pub use pending::{DEFAULT_PENDING_TTL, PendingLogins};
pub use session::{AuthUser, SESSION_COOKIE, SessionClaims, SessionKeys};
pub use signals::ShutdownHandle;
pub use state::AppState;
pub use storage::{
    EventStore, MemoryTokenStore, SqliteStore, StorageInfo, StorageMode, TokenStore,
};

/// Builds the router with CORS restricted to the frontend and request tracing.
pub fn build_router(state: AppState) -> ServerResult<Router> {
    let origin = HeaderValue::from_str(&state.frontend_url).map_err(|e| {
        ServerError::config(format!("invalid frontend URL '{}': {}", state.frontend_url, e))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serves the API on the configured address until SIGTERM/SIGINT.
pub async fn serve(config: &ServerConfig, state: AppState) -> ServerResult<()> {
    let app = build_router(state)?;
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        frontend = %config.frontend_origin(),
        production = config.production,
        "calstats server listening"
    );

    let shutdown = ShutdownHandle::new();
    shutdown.listen_for_signals();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    info!("server stopped");
    Ok(())
}
