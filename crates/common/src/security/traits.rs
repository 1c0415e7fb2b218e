//! Secret store abstraction
//!
//! One trait, two production backends (OS credential vault and encrypted
//! file) and an in-memory mock. Records are addressed by `(account, key)`;
//! keys are namespaced per account so two accounts never see each other's
//! secrets.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Key under which the serialized OAuth token is stored.
pub const TOKEN_KEY: &str = "token";

/// Key under which the granted scopes are stored.
pub const SCOPES_KEY: &str = "scopes";

/// Every key this crate writes, in listing order.
pub const KNOWN_KEYS: [&str; 2] = [TOKEN_KEY, SCOPES_KEY];

/// Errors from secret store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing stored under this key; a normal outcome for first runs.
    #[error("no '{key}' stored for account {account}")]
    NotFound { account: String, key: String },

    /// The stored data exists but cannot be decrypted or parsed.
    #[error("cannot read credential store for account {account}: {reason}")]
    Corrupted { account: String, reason: String },

    /// The OS credential vault refused the operation.
    #[error("credential vault access failed: {0}")]
    AccessFailed(String),

    /// The OS credential vault cannot be used in this session.
    #[error("credential vault unavailable: {0}")]
    Unavailable(String),

    #[error("credential store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(account: &str, key: &str) -> Self {
        Self::NotFound { account: account.to_string(), key: key.to_string() }
    }

    pub(crate) fn corrupted(account: &str, reason: impl Into<String>) -> Self {
        Self::Corrupted { account: account.to_string(), reason: reason.into() }
    }
}

/// Which backend a store writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Keyring,
    EncryptedFile,
    #[cfg(any(test, feature = "test-utils"))]
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyring => write!(f, "keyring"),
            Self::EncryptedFile => write!(f, "encrypted-file"),
            #[cfg(any(test, feature = "test-utils"))]
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Per-account key/value persistence for secrets.
///
/// Implementations must round-trip values byte-exact and treat deleting an
/// absent key as success.
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Backend identity, for diagnostics.
    fn backend(&self) -> StoreBackend;

    /// Store `value` under `(account, key)`, replacing any previous value.
    ///
    /// Existing data for the account that cannot be read back does not block
    /// the write.
    ///
    /// # Errors
    /// Backend failures (`AccessFailed`, `Io`).
    fn set(&self, account: &str, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Read the value stored under `(account, key)`.
    ///
    /// # Errors
    /// `NotFound` when absent; `Corrupted` when present but unreadable.
    fn get(&self, account: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove `(account, key)`. Idempotent, and succeeds on unreadable data.
    ///
    /// # Errors
    /// Backend failures only; an absent key is not an error.
    fn delete(&self, account: &str, key: &str) -> Result<(), StoreError>;

    /// Keys currently stored for `account`.
    ///
    /// # Errors
    /// Backend failures; an unknown account yields an empty list.
    fn list(&self, account: &str) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        assert_eq!(StoreBackend::Keyring.to_string(), "keyring");
        assert_eq!(StoreBackend::EncryptedFile.to_string(), "encrypted-file");
        assert_eq!(StoreBackend::Memory.to_string(), "memory");
    }
}
