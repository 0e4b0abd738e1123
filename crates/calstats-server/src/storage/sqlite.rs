//! SQLite-backed token and event storage.

use std::path::Path;
use std::sync::Arc;

use calstats_core::{EventTime, NormalizedEvent, TimeWindow};
use calstats_providers::BoxFuture;
use calstats_providers::google::TokenInfo;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{EventStore, StorageInfo, StorageMode, TokenStore};
use crate::error::ServerResult;

/// Users, their OAuth tokens and their synced events in one SQLite file.
///
/// Queries run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        info!(path = %path.display(), "opened SQLite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> ServerResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> ServerResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock())).await?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS oauth_tokens (
            user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            expires_at TEXT,
            scope TEXT NOT NULL,
            token_type TEXT NOT NULL,
            last_refresh TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            event_id TEXT NOT NULL,
            title TEXT NOT NULL,
            start_ms INTEGER NOT NULL,
            end_ms INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            attendees_json TEXT NOT NULL,
            is_all_day INTEGER NOT NULL,
            synced_at TEXT NOT NULL,
            PRIMARY KEY (user_id, event_id, start_ms)
        );

        CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_ms);
        "#,
    )
}

fn user_id(conn: &Connection, email: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM users WHERE email = ?1", params![email], |row| {
        row.get(0)
    })
    .optional()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn store_tokens(
    conn: &Connection,
    email: &str,
    tokens: &TokenInfo,
    name: Option<&str>,
) -> rusqlite::Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (email, name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(email) DO UPDATE SET name = COALESCE(excluded.name, users.name)",
        params![email, name, now],
    )?;
    let Some(user_id) = user_id(conn, email)? else {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    };

    conn.execute(
        "INSERT INTO oauth_tokens
            (user_id, access_token, refresh_token, expires_at, scope, token_type, last_refresh)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = COALESCE(excluded.refresh_token, oauth_tokens.refresh_token),
            expires_at = excluded.expires_at,
            scope = excluded.scope,
            token_type = excluded.token_type,
            last_refresh = excluded.last_refresh",
        params![
            user_id,
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_at.map(|t| t.to_rfc3339()),
            tokens.scopes.join(" "),
            tokens.token_type,
            tokens.last_refresh.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn load_tokens(conn: &Connection, email: &str) -> rusqlite::Result<Option<TokenInfo>> {
    conn.query_row(
        "SELECT t.access_token, t.refresh_token, t.expires_at, t.scope, t.token_type, t.last_refresh
         FROM oauth_tokens t JOIN users u ON u.id = t.user_id
         WHERE u.email = ?1",
        params![email],
        |row| {
            let expires_at: Option<String> = row.get(2)?;
            let scope: String = row.get(3)?;
            let last_refresh: String = row.get(5)?;
            Ok(TokenInfo {
                access_token: row.get(0)?,
                refresh_token: row.get(1)?,
                expires_at: expires_at.as_deref().and_then(parse_timestamp),
                scopes: scope.split_whitespace().map(str::to_string).collect(),
                token_type: row.get(4)?,
                last_refresh: parse_timestamp(&last_refresh).unwrap_or_else(Utc::now),
            })
        },
    )
    .optional()
}

fn upsert_event(
    conn: &Connection,
    user_id: i64,
    event: &NormalizedEvent,
    synced_at: &str,
) -> rusqlite::Result<()> {
    let attendees = serde_json::to_string(&event.attendee_emails)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO events
            (user_id, event_id, title, start_ms, end_ms, duration_ms, attendees_json, is_all_day, synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(user_id, event_id, start_ms) DO UPDATE SET
            title = excluded.title,
            end_ms = excluded.end_ms,
            duration_ms = excluded.duration_ms,
            attendees_json = excluded.attendees_json,
            is_all_day = excluded.is_all_day,
            synced_at = excluded.synced_at",
        params![
            user_id,
            event.id,
            event.title,
            event.start.to_utc_datetime().timestamp_millis(),
            event.end.to_utc_datetime().timestamp_millis(),
            event.duration_ms,
            attendees,
            event.is_all_day,
            synced_at,
        ],
    )?;
    Ok(())
}

struct EventRow {
    event_id: String,
    title: String,
    start_ms: i64,
    end_ms: i64,
    duration_ms: i64,
    attendees_json: String,
    is_all_day: bool,
}

impl EventRow {
    fn into_event(self) -> Option<NormalizedEvent> {
        let all_day = self.is_all_day;
        let time = |ms: i64| {
            let dt = DateTime::from_timestamp_millis(ms)?;
            Some(if all_day {
                EventTime::from_date(dt.date_naive())
            } else {
                EventTime::from_utc(dt)
            })
        };
        let start = time(self.start_ms)?;
        let end = time(self.end_ms)?;
        let attendees: Vec<String> = serde_json::from_str(&self.attendees_json).ok()?;

        Some(
            NormalizedEvent::new(self.event_id, self.title, start, end)
                .with_attendees(attendees)
                .with_duration_ms(self.duration_ms),
        )
    }
}

fn load_events(
    conn: &Connection,
    user_id: i64,
    window: &TimeWindow,
) -> rusqlite::Result<Vec<NormalizedEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, title, start_ms, end_ms, duration_ms, attendees_json, is_all_day
         FROM events
         WHERE user_id = ?1 AND start_ms < ?2 AND end_ms > ?3
         ORDER BY start_ms",
    )?;
    let rows = stmt.query_map(
        params![
            user_id,
            window.end.timestamp_millis(),
            window.start.timestamp_millis()
        ],
        |row| {
            Ok(EventRow {
                event_id: row.get(0)?,
                title: row.get(1)?,
                start_ms: row.get(2)?,
                end_ms: row.get(3)?,
                duration_ms: row.get(4)?,
                attendees_json: row.get(5)?,
                is_all_day: row.get(6)?,
            })
        },
    )?;

    let mut events = Vec::new();
    for row in rows {
        let row = row?;
        let id = row.event_id.clone();
        match row.into_event() {
            Some(event) => events.push(event),
            None => warn!(event_id = %id, "skipping unreadable stored event"),
        }
    }
    Ok(events)
}

impl TokenStore for SqliteStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Sqlite
    }

    fn store<'a>(
        &'a self,
        email: &'a str,
        tokens: TokenInfo,
        name: Option<&'a str>,
    ) -> BoxFuture<'a, ServerResult<()>> {
        let owned_email = email.to_string();
        let name = name.map(str::to_string);
        Box::pin(async move {
            self.with_conn(move |conn| {
                Ok(store_tokens(conn, &owned_email, &tokens, name.as_deref())?)
            })
            .await?;
            debug!(email, "stored tokens in SQLite");
            Ok(())
        })
    }

    fn get<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<Option<TokenInfo>>> {
        let email = email.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| Ok(load_tokens(conn, &email)?))
                .await
        })
    }

    fn remove<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<()>> {
        let owned_email = email.to_string();
        Box::pin(async move {
            let removed = self
                .with_conn(move |conn| {
                    Ok(conn.execute(
                        "DELETE FROM oauth_tokens WHERE user_id IN (SELECT id FROM users WHERE email = ?1)",
                        params![owned_email],
                    )?)
                })
                .await?;
            debug!(email, removed, "removed tokens from SQLite");
            Ok(())
        })
    }

    fn contains<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<bool>> {
        let email = email.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM oauth_tokens t JOIN users u ON u.id = t.user_id
                        WHERE u.email = ?1)",
                    params![email],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
        })
    }

    fn info(&self) -> BoxFuture<'_, ServerResult<StorageInfo>> {
        Box::pin(async move {
            self.with_conn(|conn| {
                let users: i64 =
                    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                let tokens: i64 =
                    conn.query_row("SELECT COUNT(*) FROM oauth_tokens", [], |row| row.get(0))?;
                Ok(StorageInfo {
                    mode: StorageMode::Sqlite,
                    user_count: Some(users as u64),
                    token_count: tokens as u64,
                })
            })
            .await
        })
    }
}

impl EventStore for SqliteStore {
    fn save_events<'a>(
        &'a self,
        email: &'a str,
        events: &'a [NormalizedEvent],
    ) -> BoxFuture<'a, ServerResult<usize>> {
        let owned_email = email.to_string();
        let events = events.to_vec();
        Box::pin(async move {
            if events.is_empty() {
                return Ok(0);
            }
            let total = events.len();
            let saved = self
                .with_conn(move |conn| {
                    let Some(user_id) = user_id(conn, &owned_email)? else {
                        debug!(email = %owned_email, "no stored user, skipping event save");
                        return Ok(0);
                    };

                    let synced_at = Utc::now().to_rfc3339();
                    let tx = conn.unchecked_transaction()?;
                    let mut saved = 0;
                    for event in &events {
                        match upsert_event(&tx, user_id, event, &synced_at) {
                            Ok(()) => saved += 1,
                            Err(e) => {
                                warn!(event_id = %event.id, error = %e, "failed to save event")
                            }
                        }
                    }
                    tx.commit()?;
                    Ok(saved)
                })
                .await?;
            debug!(email, saved, total, "saved events");
            Ok(saved)
        })
    }

    fn events_in_range<'a>(
        &'a self,
        email: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ServerResult<Vec<NormalizedEvent>>> {
        let email = email.to_string();
        Box::pin(async move {
            self.with_conn(move |conn| {
                let Some(user_id) = user_id(conn, &email)? else {
                    return Ok(Vec::new());
                };
                Ok(load_events(conn, user_id, &window)?)
            })
            .await
        })
    }
}
