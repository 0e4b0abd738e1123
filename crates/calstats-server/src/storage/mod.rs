//! Token and event storage.
//!
//! One [`TokenStore`] is chosen at startup: [`MemoryTokenStore`] when no
//! database is configured, [`SqliteStore`] otherwise. Only the SQLite store
//! also implements [`EventStore`].

mod memory;
mod sqlite;

pub use memory::MemoryTokenStore;
pub use sqlite::SqliteStore;

use calstats_core::{NormalizedEvent, TimeWindow};
use calstats_providers::BoxFuture;
use calstats_providers::google::TokenInfo;
use serde::Serialize;

use crate::error::ServerResult;

/// Which backend holds the tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageMode {
    #[serde(rename = "in-memory")]
    InMemory,
    #[serde(rename = "sqlite")]
    Sqlite,
}

/// Storage counters for the debug endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub mode: StorageMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    pub token_count: u64,
}

/// Per-user OAuth token storage, keyed by email.
pub trait TokenStore: Send + Sync {
    /// Returns the backend kind.
    fn mode(&self) -> StorageMode;

    /// Saves `tokens` for `email`, replacing earlier ones.
    ///
    /// When `tokens` carries no refresh token the stored one is kept.
    fn store<'a>(
        &'a self,
        email: &'a str,
        tokens: TokenInfo,
        name: Option<&'a str>,
    ) -> BoxFuture<'a, ServerResult<()>>;

    /// Returns the tokens stored for `email`.
    fn get<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<Option<TokenInfo>>>;

    /// Forgets the tokens of `email`.
    fn remove<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<()>>;

    /// Returns true when tokens exist for `email`.
    fn contains<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<bool>>;

    /// Returns counters for the debug endpoint.
    fn info(&self) -> BoxFuture<'_, ServerResult<StorageInfo>>;
}

/// Persisted copies of fetched events.
pub trait EventStore: Send + Sync {
    /// Upserts `events` for `email` keyed by (user, event id, start).
    ///
    /// Returns how many rows were written; 0 for an unknown user.
    fn save_events<'a>(
        &'a self,
        email: &'a str,
        events: &'a [NormalizedEvent],
    ) -> BoxFuture<'a, ServerResult<usize>>;

    /// Returns the stored events overlapping `window`, ordered by start.
    fn events_in_range<'a>(
        &'a self,
        email: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ServerResult<Vec<NormalizedEvent>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn info_serializes_like_the_dashboard_expects() {
        let memory = StorageInfo {
            mode: StorageMode::InMemory,
            user_count: None,
            token_count: 2,
        };
        assert_eq!(
            serde_json::to_value(&memory).unwrap(),
            json!({ "mode": "in-memory", "tokenCount": 2 })
        );

        let sqlite = StorageInfo {
            mode: StorageMode::Sqlite,
            user_count: Some(3),
            token_count: 1,
        };
        assert_eq!(
            serde_json::to_value(&sqlite).unwrap(),
            json!({ "mode": "sqlite", "userCount": 3, "tokenCount": 1 })
        );
    }
}
