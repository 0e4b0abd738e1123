//! Shared application state.

use std::sync::Arc;

use calstats_core::{CalendarStats, NormalizedEvent, aggregate_stats, aggregate_stats_in};
use calstats_providers::google::{GoogleConfig, GoogleProvider};
use chrono::Utc;
use tracing::info;

use crate::auth::AuthService;
use crate::calendar::CalendarService;
use crate::config::{ServerConfig, StatsTimezone};
use crate::error::ServerResult;
use crate::session::SessionKeys;
use crate::storage::{EventStore, MemoryTokenStore, SqliteStore, TokenStore};

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub calendar: Arc<CalendarService>,
    pub sessions: Arc<SessionKeys>,
    pub tokens: Arc<dyn TokenStore>,
    pub events: Option<Arc<dyn EventStore>>,
    pub frontend_url: String,
    pub stats_timezone: StatsTimezone,
}

impl AppState {
    /// Builds the state from a validated configuration.
    ///
    /// The token store is chosen here, once: SQLite when a database path is
    /// configured, memory otherwise.
    pub fn new(config: &ServerConfig) -> ServerResult<Self> {
        let google = config.google_config()?;
        let sessions = SessionKeys::new(
            config.jwt_secret.as_deref().unwrap_or_default(),
            config.session_lifetime()?,
            config.production,
        );

        let (tokens, events): (Arc<dyn TokenStore>, Option<Arc<dyn EventStore>>) =
            match &config.database_path {
                Some(path) => {
                    let store = Arc::new(SqliteStore::open(path)?);
                    let tokens: Arc<dyn TokenStore> = store.clone();
                    let events: Arc<dyn EventStore> = store;
                    (tokens, Some(events))
                }
                None => {
                    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
                    (tokens, None)
                }
            };
        info!(mode = ?tokens.mode(), "token storage selected");

        Ok(Self::assemble(&google, sessions, tokens, events, config.frontend_origin())?
            .with_stats_timezone(config.stats_timezone))
    }

    /// Wires the services around explicit stores.
    pub fn assemble(
        google: &GoogleConfig,
        sessions: SessionKeys,
        tokens: Arc<dyn TokenStore>,
        events: Option<Arc<dyn EventStore>>,
        frontend_url: &str,
    ) -> ServerResult<Self> {
        let auth = AuthService::new(google, tokens.clone())?;
        let provider = GoogleProvider::new(google.clone())?;

        Ok(Self {
            auth: Arc::new(auth),
            calendar: Arc::new(CalendarService::new(Arc::new(provider))),
            sessions: Arc::new(sessions),
            tokens,
            events,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            stats_timezone: StatsTimezone::Local,
        })
    }

    /// Sets the timezone used for the busiest-day computation.
    pub fn with_stats_timezone(mut self, tz: StatsTimezone) -> Self {
        self.stats_timezone = tz;
        self
    }

    /// Aggregates `events` in the configured timezone.
    pub fn aggregate(&self, events: &[NormalizedEvent]) -> CalendarStats {
        match self.stats_timezone {
            StatsTimezone::Local => aggregate_stats(events),
            StatsTimezone::Utc => aggregate_stats_in(events, &Utc),
        }
    }
}
