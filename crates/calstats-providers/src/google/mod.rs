//! Google OAuth and Google Calendar integration.
//!
//! - [`OAuthClient`] runs the web authorization code flow with PKCE:
//!   consent URL, code exchange, token refresh and user-info lookup.
//! - [`GoogleCalendarClient`] lists calendar events via Calendar API v3.
//! - [`GoogleProvider`] implements [`CalendarProvider`](crate::CalendarProvider)
//!   on top of the calendar client.
//!
//! # Example
//!
//! ```ignore
//! use calstats_providers::google::{GoogleConfig, OAuthClient, OAuthCredentials, PkceFlow};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! ));
//! let oauth = OAuthClient::new(&config)?;
//! let flow = PkceFlow::new();
//! let url = oauth.authorization_url(&flow, &config.scopes);
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{GoogleCalendarClient, MAX_PAGE_SIZE};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, OAuthEndpoints, PkceFlow, UserInfo};
pub use provider::GoogleProvider;
pub use tokens::{DEFAULT_TOKEN_TYPE, RefreshedToken, TokenInfo};
