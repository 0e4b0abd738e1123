//! OAuth 2.0 authorization code flow with PKCE for Google APIs.
//!
//! The backend builds the consent URL, Google redirects the browser to the
//! configured redirect URI, and the callback handler exchanges the code:
//!
//! 1. [`PkceFlow::new`] generates a verifier, its S256 challenge and a CSRF state
//! 2. [`OAuthClient::authorization_url`] builds the consent URL
//! 3. [`OAuthClient::exchange_code`] trades the code (with the verifier) for tokens
//! 4. [`OAuthClient::fetch_user_info`] resolves the account email
//! 5. [`OAuthClient::refresh_token`] renews expired access tokens

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::{RefreshedToken, TokenInfo};

const PROVIDER: &str = "google-oauth";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// CSRF state length (in bytes, before base64 encoding).
const STATE_LENGTH: usize = 16;

/// Google OAuth endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    /// Consent page.
    pub auth_url: String,
    /// Token exchange and refresh.
    pub token_url: String,
    /// OpenID user-info lookup.
    pub userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

impl OAuthEndpoints {
    /// Endpoints rooted at a single base URL (`{base}/auth`, `{base}/token`,
    /// `{base}/userinfo`), for mock servers.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/auth"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
        }
    }
}

/// The authenticated Google account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub email: String,
    pub name: Option<String>,
}

/// OAuth client for Google APIs.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    redirect_uri: String,
    endpoints: OAuthEndpoints,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client from the Google configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_provider(PROVIDER)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            redirect_uri: config.redirect_uri.clone(),
            endpoints: config.endpoints.clone(),
            http_client,
        })
    }

    /// Returns the redirect URI registered with Google.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Builds the Google consent URL for `flow`.
    ///
    /// Requests offline access and forces the consent prompt so Google
    /// issues a refresh token on every login.
    pub fn authorization_url(&self, flow: &PkceFlow, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            self.endpoints.auth_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&flow.challenge),
            urlencoding::encode(&flow.state),
        )
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let token_response = self.post_token_request(&params, "token exchange").await?;

        // Google reports the granted scopes; fall back to what was requested.
        let granted = token_response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| scopes.to_vec());

        info!("obtained tokens from authorization code");
        let mut tokens = TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            granted,
        );
        if let Some(token_type) = token_response.token_type {
            tokens = tokens.with_token_type(token_type);
        }
        Ok(tokens)
    }

    /// Refreshes an expired access token using the refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_request(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
            refresh_token: token_response.refresh_token,
        })
    }

    /// Looks up the email and display name of the token's owner.
    pub async fn fetch_user_info(&self, access_token: &str) -> ProviderResult<UserInfo> {
        let response = self
            .http_client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("user info request failed: {}", e))
                    .with_provider(PROVIDER)
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_provider(PROVIDER)
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(
                ProviderError::authentication("access token rejected by user info endpoint")
                    .with_provider(PROVIDER),
            );
        }
        if !status.is_success() {
            return Err(ProviderError::server(format!(
                "user info lookup failed ({}): {}",
                status, body
            ))
            .with_provider(PROVIDER));
        }

        let info: UserInfoResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid user info response: {}", e))
                .with_provider(PROVIDER)
        })?;

        let email = info.email.filter(|e| !e.is_empty()).ok_or_else(|| {
            ProviderError::authentication("Unable to retrieve user email from Google")
                .with_provider(PROVIDER)
        })?;

        debug!(email = %email, "resolved Google account");
        Ok(UserInfo {
            email,
            name: info.name,
        })
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        action: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", action, e))
                    .with_provider(PROVIDER)
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_provider(PROVIDER)
        })?;

        if status.is_server_error() {
            return Err(
                ProviderError::server(format!("{} failed ({}): {}", action, status, body))
                    .with_provider(PROVIDER),
            );
        }
        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                action, status, body
            ))
            .with_provider(PROVIDER));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
                .with_provider(PROVIDER)
        })
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_token(STATE_LENGTH);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the SHA-256 challenge for a code verifier.
    pub fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_endpoints(OAuthEndpoints::with_base(base))
    }

    fn scopes() -> Vec<String> {
        GoogleConfig::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
    }

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            // Base64 encoding of 32 bytes = 43 characters (no padding)
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc_example() {
            // RFC 7636 appendix B
            assert_eq!(
                PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn flows_are_random() {
            let flow1 = PkceFlow::new();
            let flow2 = PkceFlow::new();
            assert_ne!(flow1.verifier, flow2.verifier);
            assert_ne!(flow1.state, flow2.state);
        }
    }

    mod authorization_url {
        use super::*;

        #[test]
        fn contains_web_flow_parameters() {
            let client = OAuthClient::new(&GoogleConfig::new(OAuthCredentials::new(
                "test-client.apps.googleusercontent.com",
                "test-secret",
            )))
            .unwrap();
            let flow = PkceFlow::new();
            let url = client.authorization_url(&flow, &scopes());

            assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
            assert!(url.contains("client_id=test-client.apps.googleusercontent.com"));
            assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fcallback"));
            assert!(url.contains("response_type=code"));
            assert!(url.contains("calendar.readonly"));
            assert!(url.contains("userinfo.email"));
            assert!(url.contains("userinfo.profile"));
            assert!(url.contains(&format!("code_challenge={}", flow.challenge)));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains(&format!("state={}", flow.state)));
            assert!(url.contains("access_type=offline"));
            assert!(url.contains("prompt=consent"));
        }
    }

    mod token_endpoint {
        use super::*;

        #[tokio::test]
        async fn exchange_code_success() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=authorization_code"))
                .and(body_string_contains("code=auth-code"))
                .and(body_string_contains("code_verifier=the-verifier"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.access",
                    "refresh_token": "1//refresh",
                    "expires_in": 3599,
                    "token_type": "Bearer",
                    "scope": "openid https://www.googleapis.com/auth/calendar.readonly"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let tokens = client
                .exchange_code("auth-code", "the-verifier", &scopes())
                .await
                .unwrap();

            assert_eq!(tokens.access_token, "ya29.access");
            assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
            assert_eq!(tokens.token_type, "Bearer");
            assert_eq!(tokens.scopes.len(), 2);
            assert!(!tokens.is_expired());
        }

        #[tokio::test]
        async fn exchange_code_rejected() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(
                    ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
                )
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let err = client
                .exchange_code("bad", "verifier", &scopes())
                .await
                .unwrap_err();
            assert!(err.is_authentication());
            assert!(err.message().contains("invalid_grant"));
        }

        #[tokio::test]
        async fn refresh_returns_rotated_token() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=refresh_token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.new",
                    "expires_in": 3599,
                    "refresh_token": "1//rotated"
                })))
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let refreshed = client.refresh_token("1//old").await.unwrap();
            assert_eq!(refreshed.access_token, "ya29.new");
            assert_eq!(refreshed.expires_in, Some(3599));
            assert_eq!(refreshed.refresh_token.as_deref(), Some("1//rotated"));
        }

        #[tokio::test]
        async fn refresh_server_error_is_retryable() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let err = client.refresh_token("1//old").await.unwrap_err();
            assert!(err.is_retryable());
        }
    }

    mod user_info {
        use super::*;

        #[tokio::test]
        async fn returns_email_and_name() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/userinfo"))
                .and(header("authorization", "Bearer ya29.access"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "1234",
                    "email": "user@example.com",
                    "name": "Test User"
                })))
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let info = client.fetch_user_info("ya29.access").await.unwrap();
            assert_eq!(info.email, "user@example.com");
            assert_eq!(info.name.as_deref(), Some("Test User"));
        }

        #[tokio::test]
        async fn missing_email_is_authentication_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/userinfo"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "1234" })),
                )
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let err = client.fetch_user_info("ya29.access").await.unwrap_err();
            assert!(err.is_authentication());
            assert_eq!(err.message(), "Unable to retrieve user email from Google");
        }

        #[tokio::test]
        async fn unauthorized_token() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/userinfo"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let client = OAuthClient::new(&test_config(&server.uri())).unwrap();
            let err = client.fetch_user_info("expired").await.unwrap_err();
            assert!(err.is_authentication());
        }
    }
}
