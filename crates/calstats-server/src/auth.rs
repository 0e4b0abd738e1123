//! Google login, token lookup with refresh, and logout.

use std::sync::Arc;

use calstats_providers::google::{GoogleConfig, OAuthClient, PkceFlow};
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};
use crate::pending::PendingLogins;
use crate::storage::TokenStore;

/// Drives the OAuth flow and owns access to stored tokens.
pub struct AuthService {
    oauth: OAuthClient,
    scopes: Vec<String>,
    tokens: Arc<dyn TokenStore>,
    pending: PendingLogins,
}

impl AuthService {
    /// Creates the service for `config`, storing tokens in `tokens`.
    pub fn new(config: &GoogleConfig, tokens: Arc<dyn TokenStore>) -> ServerResult<Self> {
        Ok(Self {
            oauth: OAuthClient::new(config)?,
            scopes: config.scopes.clone(),
            tokens,
            pending: PendingLogins::default(),
        })
    }

    /// Replaces the pending-login map, e.g. to shorten its TTL.
    pub fn with_pending(mut self, pending: PendingLogins) -> Self {
        self.pending = pending;
        self
    }

    /// Starts a login and returns the Google consent URL.
    pub async fn begin_login(&self) -> ServerResult<String> {
        let flow = PkceFlow::new();
        let auth_url = self.oauth.authorization_url(&flow, &self.scopes);
        url::Url::parse(&auth_url)
            .map_err(|e| ServerError::config(format!("invalid authorization URL: {}", e)))?;

        self.pending.insert(flow.state, flow.verifier).await;
        Ok(auth_url)
    }

    /// Finishes a login: checks `state`, exchanges `code`, resolves the
    /// account and stores its tokens. Returns the account email.
    pub async fn complete_login(&self, code: &str, state: &str) -> ServerResult<String> {
        let verifier = self
            .pending
            .take(state)
            .await
            .ok_or(ServerError::InvalidState)?;

        let tokens = self
            .oauth
            .exchange_code(code, &verifier, &self.scopes)
            .await?;
        let user = self.oauth.fetch_user_info(&tokens.access_token).await?;

        self.tokens
            .store(&user.email, tokens, user.name.as_deref())
            .await?;
        info!(email = %user.email, "user logged in");
        Ok(user.email)
    }

    /// Returns a usable access token for `email`, refreshing it if expired.
    ///
    /// Tokens that cannot be refreshed are removed and `None` is returned.
    pub async fn access_token_for(&self, email: &str) -> ServerResult<Option<String>> {
        let Some(mut tokens) = self.tokens.get(email).await? else {
            return Ok(None);
        };
        if !tokens.is_expired() {
            return Ok(Some(tokens.access_token));
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            warn!(email, "access token expired and no refresh token stored");
            self.tokens.remove(email).await?;
            return Ok(None);
        };

        match self.oauth.refresh_token(&refresh_token).await {
            Ok(refreshed) => {
                tokens.apply_refresh(refreshed);
                let access_token = tokens.access_token.clone();
                self.tokens.store(email, tokens, None).await?;
                Ok(Some(access_token))
            }
            Err(e) => {
                warn!(email, error = %e, "token refresh failed, removing tokens");
                self.tokens.remove(email).await?;
                Ok(None)
            }
        }
    }

    /// Forgets the tokens of `email`.
    pub async fn logout(&self, email: &str) -> ServerResult<()> {
        self.tokens.remove(email).await?;
        info!(email, "user logged out");
        Ok(())
    }
}
