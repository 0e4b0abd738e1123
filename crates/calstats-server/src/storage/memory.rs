//! In-memory token store. Contents are lost on restart.

use std::collections::HashMap;

use calstats_providers::BoxFuture;
use calstats_providers::google::TokenInfo;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StorageInfo, StorageMode, TokenStore};
use crate::error::ServerResult;

/// Tokens held in a map keyed by email.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, TokenInfo>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn mode(&self) -> StorageMode {
        StorageMode::InMemory
    }

    fn store<'a>(
        &'a self,
        email: &'a str,
        mut tokens: TokenInfo,
        _name: Option<&'a str>,
    ) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(async move {
            let mut map = self.tokens.write().await;
            if tokens.refresh_token.is_none() {
                tokens.refresh_token = map.get(email).and_then(|old| old.refresh_token.clone());
            }
            map.insert(email.to_string(), tokens);
            debug!(email, "stored tokens in memory");
            Ok(())
        })
    }

    fn get<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<Option<TokenInfo>>> {
        Box::pin(async move { Ok(self.tokens.read().await.get(email).cloned()) })
    }

    fn remove<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(async move {
            if self.tokens.write().await.remove(email).is_some() {
                debug!(email, "removed tokens from memory");
            }
            Ok(())
        })
    }

    fn contains<'a>(&'a self, email: &'a str) -> BoxFuture<'a, ServerResult<bool>> {
        Box::pin(async move { Ok(self.tokens.read().await.contains_key(email)) })
    }

    fn info(&self) -> BoxFuture<'_, ServerResult<StorageInfo>> {
        Box::pin(async move {
            Ok(StorageInfo {
                mode: StorageMode::InMemory,
                user_count: None,
                token_count: self.tokens.read().await.len() as u64,
            })
        })
    }
}
