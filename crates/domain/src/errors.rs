//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for inboxkit
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum InboxKitError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider rejected the authorization request or code.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Stored credentials are missing, expired beyond refresh, or revoked.
    #[error("Re-authentication required: {0}")]
    ReauthRequired(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InboxKitError {
    /// `true` when the only remedy is running the login flow again.
    #[must_use]
    pub const fn is_reauth_required(&self) -> bool {
        matches!(self, Self::ReauthRequired(_))
    }
}

/// Result type alias for inboxkit operations
pub type Result<T> = std::result::Result<T, InboxKitError>;
