//! Token source implementations
//!
//! [`RefreshingTokenSource`] hands out the cached token while it is valid and
//! performs a refresh-token grant once it expires. Refreshes are serialized
//! so concurrent callers share one refresh.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::client::{OAuthClientError, OAuthProvider};
use super::traits::TokenSource;
use super::types::Token;

/// Token source that refreshes through an [`OAuthProvider`].
#[derive(Debug)]
pub struct RefreshingTokenSource {
    provider: OAuthProvider,
    current: Mutex<Token>,
}

impl RefreshingTokenSource {
    #[must_use]
    pub fn new(provider: OAuthProvider, token: Token) -> Self {
        Self { provider, current: Mutex::new(token) }
    }

    /// The token currently cached, without refreshing.
    pub async fn current(&self) -> Token {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    async fn token(&self) -> Result<Token, OAuthClientError> {
        let mut current = self.current.lock().await;
        if current.is_valid() {
            return Ok(current.clone());
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| OAuthClientError::RefreshFailed(Box::new(OAuthClientError::NoRefreshToken)))?;

        let refreshed = self.provider.refresh(&refresh_token).await.map_err(|e| {
            tracing::warn!(error = %e, "Access token refresh failed");
            OAuthClientError::RefreshFailed(Box::new(e))
        })?;

        tracing::debug!(expiry = ?refreshed.expiry, "Access token refreshed");
        *current = refreshed.clone();
        Ok(refreshed)
    }
}

/// Token source that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    #[must_use]
    pub const fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token, OAuthClientError> {
        Ok(self.token.clone())
    }
}
