//! OS credential vault backend
//!
//! Stores each record as one vault entry inside a single service, with the
//! entry name `<prefix>:<account>:<key>`. Works with macOS Keychain, Windows
//! Credential Manager and the Secret Service on Linux through the `keyring`
//! crate. Stores that lose secrets on reboot or process exit are refused.
//!
//! ```no_run
//! use inboxkit_common::security::{KeyringStore, SecretStore};
//!
//! let store = KeyringStore::open("inboxkit", "inboxkit")?;
//! store.set("user@example.com", "token", b"{...}")?;
//! # Ok::<(), inboxkit_common::security::StoreError>(())
//! ```

use keyring::credential::{CredentialBuilderApi, CredentialPersistence};
use keyring::Entry;
use tracing::debug;

use super::traits::{SecretStore, StoreBackend, StoreError, KNOWN_KEYS};

/// Entry probed by [`KeyringStore::open`] to check vault availability.
const PROBE_ENTRY: &str = "availability-probe";

/// `true` when the platform vault compiled into this build keeps secrets
/// until they are deleted.
#[must_use]
pub fn vault_persists() -> bool {
    matches!(
        keyring::default::default_credential_builder().persistence(),
        CredentialPersistence::UntilDelete
    )
}

/// Secret store backed by the platform credential vault.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service_name: String,
    prefix: String,
}

impl KeyringStore {
    /// Create a store without checking that the vault works.
    pub fn new(service_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), prefix: prefix.into() }
    }

    /// Create a store after a probe read succeeds.
    ///
    /// A probe that finds no entry counts as success; any other failure
    /// (no vault daemon, locked keychain, unsupported platform) means the
    /// vault is unusable for this process.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` when the vault does not persist
    /// secrets or the probe fails.
    pub fn open(service_name: impl Into<String>, prefix: impl Into<String>) -> Result<Self, StoreError> {
        if !vault_persists() {
            return Err(StoreError::Unavailable(
                "platform credential vault does not persist secrets".to_string(),
            ));
        }

        let store = Self::new(service_name, prefix);
        let entry_name = format!("{}:{PROBE_ENTRY}", store.prefix);

        let entry = Entry::new(&store.service_name, &entry_name)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match entry.get_secret() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(store),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn entry_name(&self, account: &str, key: &str) -> String {
        format!("{}:{account}:{key}", self.prefix)
    }

    fn create_entry(&self, account: &str, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, &self.entry_name(account, key)).map_err(|e| {
            StoreError::AccessFailed(format!("Failed to create vault entry for {key}: {e}"))
        })
    }
}

impl SecretStore for KeyringStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Keyring
    }

    fn set(&self, account: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        debug!(service = %self.service_name, account = %account, key = %key, "Storing secret in vault");

        self.create_entry(account, key)?.set_secret(value).map_err(|e| {
            StoreError::AccessFailed(format!("Failed to store {key} for {account}: {e}"))
        })
    }

    fn get(&self, account: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        debug!(service = %self.service_name, account = %account, key = %key, "Reading secret from vault");

        self.create_entry(account, key)?.get_secret().map_err(|e| match e {
            keyring::Error::NoEntry => StoreError::not_found(account, key),
            keyring::Error::BadEncoding(_) => StoreError::corrupted(account, e.to_string()),
            other => StoreError::AccessFailed(format!("Failed to read {key} for {account}: {other}")),
        })
    }

    fn delete(&self, account: &str, key: &str) -> Result<(), StoreError> {
        debug!(service = %self.service_name, account = %account, key = %key, "Deleting secret from vault");

        match self.create_entry(account, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::AccessFailed(format!(
                "Failed to delete {key} for {account}: {e}"
            ))),
        }
    }

    // The vault cannot enumerate entries through `keyring`; probe the keys
    // this crate writes instead.
    fn list(&self, account: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for key in KNOWN_KEYS {
            match self.get(account, key) {
                Ok(_) => keys.push(key.to_string()),
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_layout() {
        let store = KeyringStore::new("inboxkit", "inboxkit");
        assert_eq!(store.entry_name("user@example.com", "token"), "inboxkit:user@example.com:token");
    }

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    #[test]
    fn test_platform_vault_is_persistent() {
        assert!(vault_persists());
    }

    #[test]
    fn test_backend_identity() {
        assert_eq!(KeyringStore::new("svc", "p").backend(), StoreBackend::Keyring);
    }
}
