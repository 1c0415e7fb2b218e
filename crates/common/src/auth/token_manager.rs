//! Token persistence and refresh
//!
//! Serializes OAuth tokens and granted scopes through a [`SecretStore`],
//! keyed by an opaque account identifier (the user's email address in
//! practice):
//! - `token`: JSON-encoded [`Token`]
//! - `scopes`: JSON array of scope strings
//!
//! Refreshed tokens are written back only when the access token actually
//! changed.
//!
//! Store calls can block (PBKDF2, fsync, vault IPC). The async entry points
//! run them on tokio's blocking pool; the sync methods are for callers that
//! are already off the executor.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

use super::client::{OAuthClientError, OAuthProvider};
use super::token_source::RefreshingTokenSource;
use super::traits::TokenSource;
use super::types::{ProviderConfig, Token, TokenInfo};
use crate::security::{SecretStore, StoreBackend, StoreError, SCOPES_KEY, TOKEN_KEY};

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// No token stored for the account (not logged in)
    #[error("no token stored for account {0}")]
    NotFound(String),

    /// Login predates scope tracking, or scopes were deleted
    #[error("no granted scopes recorded for account {0}")]
    ScopesNotSet(String),

    #[error("stored {what} for account {account} is malformed: {source}")]
    Malformed {
        account: String,
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    OAuth(#[from] OAuthClientError),

    /// A blocking store task panicked or was cancelled.
    #[error("credential store task failed: {0}")]
    Task(String),
}

impl TokenManagerError {
    /// `true` when the user has to run the interactive login again.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::OAuth(e) => e.requires_reauth(),
            _ => false,
        }
    }
}

/// Token manager over a secret store.
#[derive(Debug, Clone)]
pub struct TokenManager {
    store: Arc<dyn SecretStore>,
}

impl TokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Backend the tokens are written to.
    #[must_use]
    pub fn backend(&self) -> StoreBackend {
        self.store.backend()
    }

    /// Persist `token` for `account`, replacing any previous token.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Store` if the store rejects the write.
    pub fn save_token(&self, account: &str, token: &Token) -> Result<(), TokenManagerError> {
        let bytes = serde_json::to_vec(token).map_err(|source| TokenManagerError::Malformed {
            account: account.to_string(),
            what: "token",
            source,
        })?;
        self.store.set(account, TOKEN_KEY, &bytes)?;

        debug!(account = %account, expiry = ?token.expiry, "Token saved");
        Ok(())
    }

    /// Load the token stored for `account`.
    ///
    /// # Errors
    /// - `NotFound` when nothing is stored
    /// - `Store` with `Corrupted` when the store cannot be read
    /// - `Malformed` when the stored JSON does not decode
    pub fn load_token(&self, account: &str) -> Result<Token, TokenManagerError> {
        let bytes = self.store.get(account, TOKEN_KEY).map_err(|e| match e {
            StoreError::NotFound { .. } => TokenManagerError::NotFound(account.to_string()),
            other => TokenManagerError::Store(other),
        })?;

        serde_json::from_slice(&bytes).map_err(|source| TokenManagerError::Malformed {
            account: account.to_string(),
            what: "token",
            source,
        })
    }

    /// Delete the token for `account`. Idempotent.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Store` on backend failure.
    pub fn delete_token(&self, account: &str) -> Result<(), TokenManagerError> {
        self.store.delete(account, TOKEN_KEY)?;
        debug!(account = %account, "Token deleted");
        Ok(())
    }

    /// Record the scopes granted at login.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Store` if the store rejects the write.
    pub fn save_scopes(&self, account: &str, scopes: &[String]) -> Result<(), TokenManagerError> {
        let bytes = serde_json::to_vec(scopes).map_err(|source| TokenManagerError::Malformed {
            account: account.to_string(),
            what: "scopes",
            source,
        })?;
        self.store.set(account, SCOPES_KEY, &bytes)?;
        Ok(())
    }

    /// Scopes recorded for `account`.
    ///
    /// # Errors
    /// - `ScopesNotSet` when no scopes were recorded
    /// - `Store` / `Malformed` on unreadable data
    pub fn get_granted_scopes(&self, account: &str) -> Result<Vec<String>, TokenManagerError> {
        let bytes = self.store.get(account, SCOPES_KEY).map_err(|e| match e {
            StoreError::NotFound { .. } => TokenManagerError::ScopesNotSet(account.to_string()),
            other => TokenManagerError::Store(other),
        })?;

        serde_json::from_slice(&bytes).map_err(|source| TokenManagerError::Malformed {
            account: account.to_string(),
            what: "scopes",
            source,
        })
    }

    /// Persist the token and granted scopes of a fresh login.
    ///
    /// Runs on the blocking pool.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Store` if either write fails.
    pub async fn save_credentials(
        &self,
        account: &str,
        token: &Token,
        scopes: &[String],
    ) -> Result<(), TokenManagerError> {
        let account = account.to_string();
        let token = token.clone();
        let scopes = scopes.to_vec();

        self.blocking(move |manager| {
            manager.save_token(&account, &token)?;
            manager.save_scopes(&account, &scopes)
        })
        .await
    }

    /// Remove everything stored for `account` (logout).
    ///
    /// # Errors
    /// Returns `TokenManagerError::Store` on backend failure.
    pub fn delete_all(&self, account: &str) -> Result<(), TokenManagerError> {
        self.store.delete(account, TOKEN_KEY)?;
        self.store.delete(account, SCOPES_KEY)?;
        info!(account = %account, "Removed stored credentials");
        Ok(())
    }

    /// Return a current token for `account`, refreshing it through the
    /// provider when it has expired.
    ///
    /// The store is only written when the access token changed.
    ///
    /// # Errors
    /// - `NotFound` when the account never logged in
    /// - `OAuth(RefreshFailed)` when the refresh grant is rejected
    pub async fn refresh_token(
        &self,
        account: &str,
        config: &ProviderConfig,
    ) -> Result<Token, TokenManagerError> {
        let owned = account.to_string();
        let token = self.blocking(move |manager| manager.load_token(&owned)).await?;
        let source = OAuthProvider::new(config.clone()).token_source(token.clone());

        let current = source.token().await?;
        if current.access_token != token.access_token {
            let owned = account.to_string();
            let refreshed = current.clone();
            self.blocking(move |manager| manager.save_token(&owned, &refreshed)).await?;
            info!(account = %account, "Refreshed token persisted");
        }
        Ok(current)
    }

    /// Build a reusable auto-refreshing token source for `account`.
    ///
    /// The provider config is narrowed to the scopes recorded at login (or an
    /// empty set when none were recorded). Tokens refreshed through the
    /// source are written back to the store.
    ///
    /// # Errors
    /// Returns `NotFound` when the account never logged in.
    pub fn get_token_source(
        &self,
        account: &str,
        config: &ProviderConfig,
    ) -> Result<PersistingTokenSource, TokenManagerError> {
        let token = self.load_token(account)?;
        let scopes = match self.get_granted_scopes(account) {
            Ok(scopes) => scopes,
            Err(TokenManagerError::ScopesNotSet(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let provider = OAuthProvider::new(config.clone().with_scopes(scopes));
        Ok(PersistingTokenSource {
            last_access_token: Mutex::new(token.access_token.clone()),
            inner: provider.token_source(token),
            manager: self.clone(),
            account: account.to_string(),
        })
    }

    /// Diagnostic view of what is stored for `account`.
    ///
    /// Never fails: absence is a normal state. Unreadable storage is logged,
    /// reported as no token, and described in `unreadable` so callers can
    /// tell it apart from "not logged in".
    #[must_use]
    pub fn get_token_info(&self, account: &str) -> TokenInfo {
        let (scopes, scopes_error) = match self.get_granted_scopes(account) {
            Ok(scopes) => (scopes, None),
            Err(TokenManagerError::ScopesNotSet(_)) => (Vec::new(), None),
            Err(e) => {
                warn!(account = %account, error = %e, "Stored scopes are unreadable");
                (Vec::new(), Some(e.to_string()))
            }
        };

        match self.load_token(account) {
            Ok(token) => TokenInfo {
                has_token: true,
                is_expired: token.is_expired(),
                has_refresh_token: token.refresh_token.is_some(),
                token_type: Some(token.token_type),
                expiry: token.expiry,
                scopes,
                unreadable: scopes_error,
            },
            Err(TokenManagerError::NotFound(_)) => {
                TokenInfo { scopes, unreadable: scopes_error, ..TokenInfo::default() }
            }
            Err(e) => {
                warn!(account = %account, error = %e, "Stored token is unreadable");
                TokenInfo { scopes, unreadable: Some(e.to_string()), ..TokenInfo::default() }
            }
        }
    }

    /// Run `op` against a clone of this manager on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, TokenManagerError>
    where
        F: FnOnce(Self) -> Result<T, TokenManagerError> + Send + 'static,
        T: Send + 'static,
    {
        let manager = self.clone();
        task::spawn_blocking(move || op(manager))
            .await
            .map_err(|e| TokenManagerError::Task(e.to_string()))?
    }
}

/// Auto-refreshing token source that writes refreshed tokens back to the
/// token manager's store.
#[derive(Debug)]
pub struct PersistingTokenSource {
    inner: RefreshingTokenSource,
    manager: TokenManager,
    account: String,
    last_access_token: Mutex<String>,
}

impl PersistingTokenSource {
    /// Account this source serves.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }
}

#[async_trait]
impl TokenSource for PersistingTokenSource {
    async fn token(&self) -> Result<Token, OAuthClientError> {
        let token = self.inner.token().await?;

        let mut last = self.last_access_token.lock().await;
        if *last != token.access_token {
            // A failed write leaves the old token on disk; the next run
            // refreshes again.
            let account = self.account.clone();
            let refreshed = token.clone();
            let saved = self
                .manager
                .blocking(move |manager| manager.save_token(&account, &refreshed))
                .await;
            match saved {
                Ok(()) => *last = token.access_token.clone(),
                Err(e) => warn!(account = %self.account, error = %e, "Failed to persist refreshed token"),
            }
        }
        Ok(token)
    }
}
