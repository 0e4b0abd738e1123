//! Session tokens and the `token` cookie.
//!
//! A session is an HS256 JWT carrying the user's email, stored in an
//! HttpOnly cookie. [`AuthUser`] extracts and verifies it.

use std::fmt;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ServerResult};
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens, and renders the session cookie.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
    production: bool,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("lifetime", &self.lifetime)
            .field("production", &self.production)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    /// Creates keys from the shared secret.
    pub fn new(secret: &str, lifetime: Duration, production: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
            production,
        }
    }

    /// Session lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a token valid for the configured lifetime.
    pub fn issue(&self, user_id: &str, email: &str) -> ServerResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.lifetime.num_seconds(),
        };
        self.encode(&claims)
    }

    fn encode(&self, claims: &SessionClaims) -> ServerResult<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    /// Returns the claims of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "rejected session token");
                None
            }
        }
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.lifetime.num_seconds())
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    /// [`Self::clear_cookie`] as a header value.
    pub fn clear_cookie_header(&self) -> HeaderValue {
        HeaderValue::from_str(&self.clear_cookie())
            .unwrap_or_else(|_| HeaderValue::from_static("token=; Path=/; Max-Age=0"))
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let same_site = if self.production { "Strict" } else { "Lax" };
        let mut cookie = format!(
            "{SESSION_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age}; SameSite={same_site}"
        );
        if self.production {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Reads the session cookie from request headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// The logged-in user, taken from a verified session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Err(ApiError::unauthorized("Authentication required. Please login."));
        };

        match state.sessions.verify(&token) {
            Some(claims) => Ok(claims.into()),
            None => Err(
                ApiError::unauthorized("Invalid or expired token. Please login again.")
                    .with_cookie(state.sessions.clear_cookie_header()),
            ),
        }
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(token_from_headers(&parts.headers)
            .and_then(|token| state.sessions.verify(&token))
            .map(Into::into))
    }
}
