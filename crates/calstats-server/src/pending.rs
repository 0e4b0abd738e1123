//! Logins waiting for Google's callback.
//!
//! Maps the OAuth `state` parameter to the PKCE verifier of the flow that
//! generated it. Entries expire after a TTL and can be taken only once.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, trace};

/// How long a user has to finish the consent screen.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct PendingEntry {
    verifier: String,
    expires_at: Instant,
}

impl PendingEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Pending logins keyed by OAuth state.
#[derive(Debug)]
pub struct PendingLogins {
    ttl: Duration,
    entries: RwLock<HashMap<String, PendingEntry>>,
}

impl Default for PendingLogins {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}

impl PendingLogins {
    /// Creates an empty map with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Remembers `verifier` under `state`.
    pub async fn insert(&self, state: impl Into<String>, verifier: impl Into<String>) {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries);
        entries.insert(
            state.into(),
            PendingEntry {
                verifier: verifier.into(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Removes and returns the verifier for `state`, if it has not expired.
    pub async fn take(&self, state: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries);
        entries.remove(state).map(|entry| entry.verifier)
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    /// Returns true if no live entries remain.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn purge_expired(entries: &mut HashMap<String, PendingEntry>) {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    let purged = before - entries.len();
    if purged > 0 {
        debug!(purged, "purged expired pending logins");
    } else {
        trace!("no expired pending logins");
    }
}
