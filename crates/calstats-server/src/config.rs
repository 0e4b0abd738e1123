//! Server configuration.
//!
//! Settings come from an optional TOML file and are then overridden by CLI
//! flags and environment variables (see `main.rs`).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use calstats_core::TracingOutputFormat;
use calstats_providers::google::{GoogleConfig, OAuthCredentials};
use chrono::Duration;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

/// Timezone used to bucket events by weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsTimezone {
    /// The server's local timezone.
    #[default]
    Local,
    /// UTC.
    Utc,
}

impl FromStr for StatsTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(format!("unknown stats timezone '{}' (expected local or utc)", other)),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// OAuth client ID.
    pub google_client_id: Option<String>,

    /// OAuth client secret.
    pub google_client_secret: Option<String>,

    /// Google Cloud Console credentials JSON, used when id/secret are unset.
    pub google_credentials_file: Option<PathBuf>,

    /// Where Google redirects after consent.
    pub google_redirect_uri: String,

    /// Dashboard origin; also the only allowed CORS origin.
    pub frontend_url: String,

    /// HMAC secret for session tokens.
    pub jwt_secret: Option<String>,

    /// Session lifetime, `<n>[s|m|h|d]`.
    pub jwt_expires_in: String,

    /// Listen address.
    pub bind_address: String,

    /// Listen port.
    pub port: u16,

    /// SQLite file. Unset means tokens are kept in memory.
    pub database_path: Option<PathBuf>,

    /// Production mode: secure, strict session cookies.
    pub production: bool,

    /// Log output format (`pretty`, `compact` or `json`).
    pub log_format: String,

    /// Timezone for the busiest-day computation.
    pub stats_timezone: StatsTimezone,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_client_secret: None,
            google_credentials_file: None,
            google_redirect_uri: GoogleConfig::DEFAULT_REDIRECT_URI.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            jwt_secret: None,
            jwt_expires_in: "7d".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            database_path: None,
            production: false,
            log_format: "pretty".to_string(),
            stats_timezone: StatsTimezone::Local,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from the default path, or defaults when no
    /// file exists there.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the configuration from a TOML file.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ServerError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns `$XDG_CONFIG_HOME/calstats/config.toml` (or the platform equivalent).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calstats")
            .join("config.toml")
    }

    /// Lists the environment names of every required setting that is unset.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.google_credentials_file.is_none() {
            if is_blank(&self.google_client_id) {
                missing.push("GOOGLE_CLIENT_ID");
            }
            if is_blank(&self.google_client_secret) {
                missing.push("GOOGLE_CLIENT_SECRET");
            }
        }
        if is_blank(&self.jwt_secret) {
            missing.push("JWT_SECRET");
        }
        missing
    }

    /// Checks that every required setting is present and well formed.
    pub fn validate(&self) -> ServerResult<()> {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            return Err(ServerError::missing_settings(missing));
        }

        self.session_lifetime()?;
        self.tracing_format()?;

        for (name, value) in [
            ("FRONTEND_URL", &self.frontend_url),
            ("GOOGLE_REDIRECT_URI", &self.google_redirect_uri),
        ] {
            url::Url::parse(value)
                .map_err(|e| ServerError::config(format!("invalid {} '{}': {}", name, value, e)))?;
        }
        Ok(())
    }

    /// Returns the parsed session lifetime.
    pub fn session_lifetime(&self) -> ServerResult<Duration> {
        parse_lifetime(&self.jwt_expires_in).ok_or_else(|| {
            ServerError::config(format!(
                "invalid JWT_EXPIRES_IN '{}' (expected e.g. 3600, 30m, 12h, 7d)",
                self.jwt_expires_in
            ))
        })
    }

    /// Returns the parsed log format.
    pub fn tracing_format(&self) -> ServerResult<TracingOutputFormat> {
        self.log_format
            .parse()
            .map_err(|_| ServerError::config(format!("unknown log format '{}'", self.log_format)))
    }

    /// Resolves the OAuth client credentials.
    ///
    /// An explicit id/secret pair wins over the credentials file.
    pub fn credentials(&self) -> ServerResult<OAuthCredentials> {
        if let (Some(id), Some(secret)) = (&self.google_client_id, &self.google_client_secret) {
            if !id.trim().is_empty() && !secret.trim().is_empty() {
                return Ok(OAuthCredentials::new(id.trim(), secret.trim()));
            }
        }
        match &self.google_credentials_file {
            Some(path) => Ok(OAuthCredentials::from_file(path)?),
            None => Err(ServerError::missing_settings([
                "GOOGLE_CLIENT_ID",
                "GOOGLE_CLIENT_SECRET",
            ])),
        }
    }

    /// Builds the validated Google client configuration.
    pub fn google_config(&self) -> ServerResult<GoogleConfig> {
        let config =
            GoogleConfig::new(self.credentials()?).with_redirect_uri(&self.google_redirect_uri);
        config.validate()?;
        Ok(config)
    }

    /// Returns the frontend origin without a trailing slash.
    pub fn frontend_origin(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }

    /// Returns `address:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Parses a lifetime such as `3600`, `30s`, `15m`, `12h` or `7d`.
///
/// A bare number is seconds. Zero is rejected.
pub fn parse_lifetime(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&value[..idx], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };

    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}
