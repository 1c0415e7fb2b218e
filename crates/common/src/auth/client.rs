//! OAuth 2.0 provider client for the authorization-code flow with PKCE
//!
//! Handles:
//! - Authorization URL building
//! - Authorization code exchange
//! - Token refresh
//! - Auto-refreshing token sources

use std::time::Duration;

use reqwest::Client;

use super::token_source::RefreshingTokenSource;
use super::types::{OAuthError, ProviderConfig, Token, TokenResponse};

/// HTTP timeout applied to every token endpoint call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for OAuth provider operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed
    RequestFailed(reqwest::Error),

    /// OAuth server rejected the request
    OAuthError(OAuthError),

    /// Failed to parse response
    ParseError(String),

    /// No refresh token available
    NoRefreshToken,

    /// Invalid configuration
    ConfigError(String),

    /// Refreshing an expired token failed; the user must log in again
    RefreshFailed(Box<OAuthClientError>),
}

impl OAuthClientError {
    /// `true` when re-running the interactive login is the only remedy.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::NoRefreshToken)
    }
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::RefreshFailed(e) => write!(f, "Token refresh failed: {e}"),
        }
    }
}

impl std::error::Error for OAuthClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestFailed(e) => Some(e),
            Self::OAuthError(e) => Some(e),
            Self::RefreshFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// OAuth 2.0 client bound to one provider configuration.
///
/// Implements RFC 6749 (authorization code grant, refresh grant) and
/// RFC 7636 (PKCE, `S256`).
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    config: ProviderConfig,
    client: Client,
}

impl OAuthProvider {
    /// Create a provider client with a default HTTP client.
    ///
    /// # Examples
    /// ```
    /// use inboxkit_common::auth::{OAuthProvider, ProviderConfig};
    ///
    /// let config = ProviderConfig::new(
    ///     "client-id",
    ///     "client-secret",
    ///     "https://accounts.example.com/o/oauth2/auth",
    ///     "https://oauth2.example.com/token",
    /// )
    /// .with_redirect_uri("http://localhost:8089/callback");
    /// let provider = OAuthProvider::new(config);
    /// assert!(provider.validate().is_ok());
    /// ```
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Create a provider client sharing an existing HTTP client.
    #[must_use]
    pub const fn with_http_client(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Fail fast on a missing client id or secret, before any network call or
    /// browser launch.
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` naming the missing credential.
    pub fn validate(&self) -> Result<(), OAuthClientError> {
        if self.config.client_id.trim().is_empty() {
            return Err(OAuthClientError::ConfigError("client ID is required".to_string()));
        }
        if self.config.client_secret.trim().is_empty() {
            return Err(OAuthClientError::ConfigError("client secret is required".to_string()));
        }
        Ok(())
    }

    /// Build the URL the user opens to grant consent.
    ///
    /// Requests offline access and forces the consent prompt so the provider
    /// issues a refresh token on every login.
    #[must_use]
    pub fn auth_url(&self, state: &str, code_challenge: &str) -> String {
        let params = [
            ("response_type", "code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("scope", self.config.scope_string()),
            ("state", state.to_string()),
            ("code_challenge", code_challenge.to_string()),
            ("code_challenge_method", super::pkce::CHALLENGE_METHOD.to_string()),
            ("access_type", "offline".to_string()),
            ("prompt", "consent".to_string()),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.config.auth_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query_string}", self.config.auth_url)
    }

    /// Exchange an authorization code and its PKCE verifier for a token.
    ///
    /// # Errors
    /// - `RequestFailed` on transport failure
    /// - `OAuthError` when the provider rejects the code
    /// - `ParseError` on a malformed response
    pub async fn exchange(&self, code: &str, code_verifier: &str) -> Result<Token, OAuthClientError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ];

        tracing::debug!(token_url = %self.config.token_url, "Exchanging authorization code");
        let response = self.post_token_request(&params).await?;
        Ok(response.into_token(None))
    }

    /// Use a refresh token to mint a new access token.
    ///
    /// When the provider does not rotate the refresh token, the returned
    /// token keeps `refresh_token`.
    ///
    /// # Errors
    /// - `NoRefreshToken` for an empty refresh token
    /// - `OAuthError` when the grant was revoked or expired
    /// - `RequestFailed` / `ParseError` as for [`Self::exchange`]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        tracing::debug!(token_url = %self.config.token_url, "Refreshing access token");
        let response = self.post_token_request(&params).await?;
        Ok(response.into_token(Some(refresh_token.to_string())))
    }

    /// Wrap `token` in a source that refreshes it on demand.
    #[must_use]
    pub fn token_source(&self, token: Token) -> RefreshingTokenSource {
        RefreshingTokenSource::new(self.clone(), token)
    }

    /// Get a reference to the provider configuration
    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Get the configured redirect URI
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, OAuthClientError> {
        let response = self.client.post(&self.config.token_url).form(params).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<OAuthError>(&body).map_or_else(
                |_| OAuthClientError::ParseError(format!("token endpoint returned {status}: {body}")),
                OAuthClientError::OAuthError,
            ));
        }

        serde_json::from_str(&body).map_err(|e| OAuthClientError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn create_test_config(token_url: &str) -> ProviderConfig {
        ProviderConfig::new(
            "test_client_id",
            "test_client_secret",
            "https://accounts.example.com/o/oauth2/auth",
            token_url,
        )
        .with_redirect_uri("http://localhost:8089/callback")
        .with_scopes(vec![
            "https://www.googleapis.com/auth/gmail.modify".to_string(),
            "email".to_string(),
        ])
    }

    /// Validates `OAuthProvider::auth_url` query parameters.
    ///
    /// Assertions:
    /// - URL starts with the authorization endpoint.
    /// - Every PKCE, consent and offline-access parameter is present and
    ///   percent-encoded.
    #[test]
    fn test_auth_url_parameters() {
        let provider = OAuthProvider::new(create_test_config("https://oauth2.example.com/token"));
        let url = provider.auth_url("state-123", "challenge-abc");

        assert!(url.starts_with("https://accounts.example.com/o/oauth2/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8089%2Fcallback"));
        assert!(url.contains(
            "scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.modify%20email"
        ));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("code_challenge=challenge-abc"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(!url.contains("test_client_secret"));
    }

    /// Validates `OAuthProvider::validate` for missing credentials.
    ///
    /// Assertions:
    /// - Empty client id fails with `ConfigError`.
    /// - Empty client secret fails with `ConfigError`.
    #[test]
    fn test_validate_missing_credentials() {
        let mut config = create_test_config("https://oauth2.example.com/token");
        config.client_id = String::new();
        assert!(matches!(
            OAuthProvider::new(config).validate(),
            Err(OAuthClientError::ConfigError(_))
        ));

        let mut config = create_test_config("https://oauth2.example.com/token");
        config.client_secret = "  ".to_string();
        assert!(matches!(
            OAuthProvider::new(config).validate(),
            Err(OAuthClientError::ConfigError(_))
        ));
    }

    /// Validates the code exchange request body and response parsing.
    ///
    /// Assertions:
    /// - Body carries the grant type, code and verifier.
    /// - Returned token has the issued access and refresh tokens.
    #[tokio::test]
    async fn test_exchange_sends_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier=verifier-xyz"))
            .and(body_string_contains("client_secret=test_client_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.access",
                "refresh_token": "1//refresh",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OAuthProvider::new(create_test_config(&format!("{}/token", server.uri())));
        let token = provider.exchange("auth-code", "verifier-xyz").await.unwrap();

        assert_eq!(token.access_token, "ya29.access");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert!(token.is_valid());
    }

    /// Validates provider rejections surface as `OAuthError`.
    ///
    /// Assertions:
    /// - A 400 with an OAuth error body maps to `OAuthError` with its code.
    #[tokio::test]
    async fn test_exchange_provider_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Malformed auth code."
            })))
            .mount(&server)
            .await;

        let provider = OAuthProvider::new(create_test_config(&format!("{}/token", server.uri())));
        let result = provider.exchange("bad-code", "verifier").await;

        match result {
            Err(OAuthClientError::OAuthError(error)) => assert_eq!(error.error, "invalid_grant"),
            other => panic!("expected OAuthError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = OAuthProvider::new(create_test_config(&format!("{}/token", server.uri())));
        let result = provider.exchange("code", "verifier").await;

        assert!(matches!(result, Err(OAuthClientError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_refresh_with_empty_token() {
        let provider = OAuthProvider::new(create_test_config("https://oauth2.example.com/token"));

        let result = provider.refresh("").await;
        assert!(matches!(result, Err(OAuthClientError::NoRefreshToken)));
    }

    /// Validates refresh keeps the refresh token when it is not rotated.
    ///
    /// Assertions:
    /// - Body carries `grant_type=refresh_token`.
    /// - New token keeps the original refresh token.
    #[tokio::test]
    async fn test_refresh_keeps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=keep-me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let provider = OAuthProvider::new(create_test_config(&format!("{}/token", server.uri())));
        let token = provider.refresh("keep-me").await.unwrap();

        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.refresh_token.as_deref(), Some("keep-me"));
    }

    #[test]
    fn test_requires_reauth_classification() {
        let refresh_failed = OAuthClientError::RefreshFailed(Box::new(OAuthClientError::NoRefreshToken));
        assert!(refresh_failed.requires_reauth());
        assert!(!OAuthClientError::ConfigError("x".to_string()).requires_reauth());
    }
}
