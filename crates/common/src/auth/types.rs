//! OAuth 2.0 types and structures
//!
//! Tokens, token endpoint responses, provider configuration and the
//! diagnostic token view exposed by the token manager.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds subtracted from `expiry` before a token is considered usable.
pub const EXPIRY_DELTA_SECONDS: i64 = 10;

/// OAuth 2.0 access token with its optional refresh token and expiry.
///
/// Serialized with the field names `access_token`, `token_type`,
/// `refresh_token` and `expiry` (RFC 3339). A token is never mutated in
/// place: refreshing yields a new `Token` that replaces the stored one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer credential sent to the API
    pub access_token: String,

    /// Token type, `Bearer` for every provider this crate targets
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Long-lived credential used to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry; `None` means the token does not expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Build a token from its parts, computing `expiry` from a lifetime in
    /// seconds. A non-positive lifetime leaves the expiry unset.
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        let expiry =
            (expires_in > 0).then(|| Utc::now() + chrono::Duration::seconds(expires_in));

        Self { access_token, token_type: default_token_type(), refresh_token, expiry }
    }

    /// `true` when the access token is non-empty and its expiry (minus a
    /// small skew) has not passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// `true` when an expiry is set and it falls within
    /// [`EXPIRY_DELTA_SECONDS`] of now or earlier.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| {
            Utc::now() + chrono::Duration::seconds(EXPIRY_DELTA_SECONDS) >= expiry
        })
    }

    /// Seconds until expiry, `None` when the token does not expire.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expiry.map(|expiry| (expiry - Utc::now()).num_seconds())
    }

    /// Value for the HTTP `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a [`Token`], keeping `previous_refresh` when the
    /// response does not rotate the refresh token.
    #[must_use]
    pub fn into_token(self, previous_refresh: Option<String>) -> Token {
        let mut token = Token::new(
            self.access_token,
            self.refresh_token.or(previous_refresh),
            self.expires_in.unwrap_or_default(),
        );
        if let Some(token_type) = self.token_type.filter(|t| !t.is_empty()) {
            token.token_type = token_type;
        }
        token
    }
}

impl From<TokenResponse> for Token {
    fn from(response: TokenResponse) -> Self {
        response.into_token(None)
    }
}

/// Provider endpoints and client credentials for one OAuth application.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret (installed-app secrets are not confidential,
    /// but are still required by the provider)
    pub client_secret: String,

    /// Authorization endpoint
    pub auth_url: String,

    /// Token endpoint
    pub token_url: String,

    /// Loopback redirect URI registered for this attempt
    pub redirect_uri: String,

    /// Requested scopes
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            redirect_uri: String::new(),
            scopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Scopes as the space-separated `scope` parameter.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// OAuth error response from the authorization server (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Diagnostic snapshot of what is stored for an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub has_token: bool,
    pub is_expired: bool,
    pub has_refresh_token: bool,
    pub token_type: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    /// Why stored data could not be read, when it exists but is unusable.
    /// `None` both for a healthy login and for "not logged in".
    pub unreadable: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::types.
    use super::*;

    fn token_expiring_in(seconds: i64) -> Token {
        Token {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Validates validity around the expiry skew.
    ///
    /// Assertions:
    /// - Token expiring in an hour is valid.
    /// - Token expiring inside the skew window is expired.
    /// - Token already past expiry is expired.
    #[test]
    fn test_token_validity() {
        assert!(token_expiring_in(3600).is_valid());
        assert!(!token_expiring_in(EXPIRY_DELTA_SECONDS - 5).is_valid());
        assert!(token_expiring_in(-60).is_expired());
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = Token::new("access".to_string(), None, 0);
        assert!(token.expiry.is_none());
        assert!(token.is_valid());
        assert!(token.seconds_until_expiry().is_none());
    }

    #[test]
    fn test_empty_access_token_is_invalid() {
        let token = Token::new(String::new(), None, 3600);
        assert!(!token.is_valid());
    }

    /// Validates the JSON shape of a stored token.
    ///
    /// Assertions:
    /// - Field names are `access_token`, `token_type`, `refresh_token`,
    ///   `expiry`.
    /// - Round trip preserves the value.
    #[test]
    fn test_token_json_shape() {
        let token = token_expiring_in(3600);
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json["access_token"], "access");
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["refresh_token"], "refresh");
        assert!(json["expiry"].is_string());

        let decoded: Token = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_token_accepts_minimal_json() {
        let decoded: Token = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(decoded.token_type, "Bearer");
        assert!(decoded.refresh_token.is_none());
        assert!(decoded.expiry.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = token_expiring_in(3600);
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("access\""));
        assert!(!rendered.contains("\"refresh\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    /// Validates refresh token carry-over on responses that omit it.
    ///
    /// Assertions:
    /// - Missing `refresh_token` keeps the previous one.
    /// - A rotated `refresh_token` replaces it.
    #[test]
    fn test_response_keeps_previous_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3600}"#).unwrap();
        let token = response.into_token(Some("old-refresh".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.token_type, "Bearer");
        assert!(token.is_valid());

        let rotated: TokenResponse = serde_json::from_str(
            r#"{"access_token":"new","refresh_token":"rotated","token_type":"Bearer"}"#,
        )
        .unwrap();
        let token = rotated.into_token(Some("old-refresh".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
    }

    #[test]
    fn test_oauth_error_display() {
        let error = OAuthError {
            error: "invalid_grant".to_string(),
            error_description: Some("Token has been expired or revoked.".to_string()),
        };
        assert_eq!(error.to_string(), "invalid_grant: Token has been expired or revoked.");
    }

    #[test]
    fn test_provider_config_scope_string_and_debug() {
        let config = ProviderConfig::new("id", "secret", "https://a", "https://t")
            .with_scopes(vec!["one".to_string(), "two".to_string()]);
        assert_eq!(config.scope_string(), "one two");
        assert!(!format!("{config:?}").contains("secret\""));
    }
}
