//! Traits for token acquisition
//!
//! Abstracts where a usable access token comes from so API clients can be
//! tested against fixed tokens.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::Token;

/// Source of a currently valid access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token that is valid right now, refreshing it if the
    /// implementation supports refresh.
    ///
    /// # Errors
    /// Returns `OAuthClientError::RefreshFailed` when the token expired and
    /// could not be refreshed.
    async fn token(&self) -> Result<Token, OAuthClientError>;
}
