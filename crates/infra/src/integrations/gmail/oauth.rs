//! Interactive Gmail login.
//!
//! [`AuthFlow::login`] runs the whole authorization-code flow:
//!
//! 1. validate client credentials (before any listener or browser)
//! 2. generate PKCE verifier, challenge and CSRF state
//! 3. start the loopback [`CallbackServer`]
//! 4. open the authorization URL in the browser
//! 5. wait for the redirect under the overall timeout
//! 6. exchange the code, then look up the account's email address
//! 7. persist token and scopes under that address

use std::time::Duration;

use inboxkit_common::auth::{
    OAuthClientError, OAuthProvider, PkceChallenge, ProviderConfig, Token, TokenManager,
    TokenManagerError,
};
use inboxkit_domain::constants::{
    DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_REDIRECT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use inboxkit_domain::AuthConfig;
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::callback::{CallbackError, CallbackServer};
use super::profile::{fetch_profile, ProfileError};
use super::{default_scopes, GMAIL_PROFILE_URL, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
use crate::platform::{open_or_print, BrowserLauncher, SystemBrowser};

/// Errors from the interactive login.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// Client credentials missing or invalid; nothing was started.
    #[error("invalid OAuth configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error("authorization code exchange failed: {0}")]
    Exchange(#[from] OAuthClientError),

    #[error("could not determine account identity: {0}")]
    Identity(#[from] ProfileError),

    #[error("could not persist credentials: {0}")]
    Storage(#[from] TokenManagerError),
}

/// Endpoints, client credentials and timing for the Gmail login.
#[derive(Debug, Clone)]
pub struct GmailOAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
    pub auth_timeout: Duration,
    /// Per-request limit for the identity lookup
    pub request_timeout: Duration,
}

impl GmailOAuthSettings {
    /// Google endpoints and default Gmail scopes.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            profile_url: GMAIL_PROFILE_URL.to_string(),
            scopes: default_scopes(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let mut settings = Self::new(&config.client_id, &config.client_secret);
        if !config.scopes.is_empty() {
            settings.scopes.clone_from(&config.scopes);
        }
        settings.redirect_port = config.redirect_port;
        settings.auth_timeout = Duration::from_secs(config.auth_timeout_secs);
        settings
    }

    /// Point the flow at other endpoints (tests, proxies).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        profile_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.profile_url = profile_url.into();
        self
    }

    /// Provider configuration without a redirect URI; the flow fills it in
    /// once the listener port is known.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.auth_url.clone(),
            self.token_url.clone(),
        )
        .with_scopes(self.scopes.clone())
    }
}

/// Result of a completed login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Email address the credentials are stored under
    pub account: String,
    pub token: Token,
    pub scopes: Vec<String>,
}

/// Orchestrates the interactive login.
pub struct AuthFlow<B: BrowserLauncher = SystemBrowser> {
    settings: GmailOAuthSettings,
    token_manager: TokenManager,
    browser: B,
    http: Client,
    cancel: CancellationToken,
}

impl AuthFlow<SystemBrowser> {
    pub fn new(settings: GmailOAuthSettings, token_manager: TokenManager) -> Self {
        Self::with_browser(settings, token_manager, SystemBrowser)
    }
}

impl<B: BrowserLauncher> AuthFlow<B> {
    pub fn with_browser(settings: GmailOAuthSettings, token_manager: TokenManager, browser: B) -> Self {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { settings, token_manager, browser, http, cancel: CancellationToken::new() }
    }

    /// Token that aborts an in-progress [`Self::login`] wait.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub const fn settings(&self) -> &GmailOAuthSettings {
        &self.settings
    }

    /// Run the login and store the resulting credentials.
    ///
    /// # Errors
    /// - `InvalidConfig` before anything starts when credentials are missing
    /// - `Callback` on bind failure, provider denial, state mismatch, timeout
    ///   or cancellation
    /// - `Exchange` when the provider rejects the code
    /// - `Identity` when the profile lookup fails
    /// - `Storage` when the credential store cannot be written
    #[instrument(skip(self), fields(port = self.settings.redirect_port))]
    pub async fn login(&self) -> Result<LoginOutcome, AuthFlowError> {
        OAuthProvider::new(self.settings.provider_config())
            .validate()
            .map_err(|e| AuthFlowError::InvalidConfig(e.to_string()))?;

        let pkce = PkceChallenge::generate();
        let mut server =
            CallbackServer::start_with_cancellation(self.settings.redirect_port, self.cancel.child_token())
                .await?;
        server.set_expected_state(pkce.state.clone());

        let provider = OAuthProvider::new(
            self.settings.provider_config().with_redirect_uri(server.redirect_uri()),
        );
        let auth_url = provider.auth_url(&pkce.state, &pkce.code_challenge);

        open_or_print(&self.browser, &auth_url);
        info!(redirect_uri = %server.redirect_uri(), "Waiting for authorization");

        let code = server.wait_for_callback(self.settings.auth_timeout).await;
        server.stop().await;
        let code = code.inspect_err(|e| warn!(error = %e, "Authorization did not complete"))?;

        let token = provider.exchange(&code, &pkce.code_verifier).await?;
        let profile = fetch_profile(&self.http, &self.settings.profile_url, &token).await?;
        let account = profile.email_address;

        self.token_manager.save_credentials(&account, &token, &self.settings.scopes).await?;

        info!(account = %account, backend = %self.token_manager.backend(), "Login complete");
        Ok(LoginOutcome { account, token, scopes: self.settings.scopes.clone() })
    }
}
