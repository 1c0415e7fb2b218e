//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::security::{SecretStore, StoreBackend, StoreError};

type Records = Mutex<BTreeMap<(String, String), Vec<u8>>>;

/// In-memory secret store for testing
///
/// Counts writes so tests can assert that an operation did not persist.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-utils")]
/// # {
/// use inboxkit_common::security::SecretStore;
/// use inboxkit_common::testing::MemorySecretStore;
///
/// let store = MemorySecretStore::new();
/// store.set("user@example.com", "token", b"secret").unwrap();
/// assert_eq!(store.get("user@example.com", "token").unwrap(), b"secret");
/// assert_eq!(store.write_count(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    records: Records,
    writes: AtomicUsize,
    fail_with: Mutex<Option<String>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail with `AccessFailed(message)`
    pub fn fail_with(&self, message: impl Into<String>) {
        // SAFETY: Mutex poisoning is acceptable in test mocks - if a test panics,
        // the entire test fails anyway
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::AccessFailed(message.clone())),
            None => Ok(()),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    fn set(&self, account: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_failure()?;
        self.records
            .lock()
            .unwrap()
            .insert((account.to_string(), key.to_string()), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, account: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.check_failure()?;
        self.records
            .lock()
            .unwrap()
            .get(&(account.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(account, key))
    }

    fn delete(&self, account: &str, key: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        self.records.lock().unwrap().remove(&(account.to_string(), key.to_string()));
        Ok(())
    }

    fn list(&self, account: &str) -> Result<Vec<String>, StoreError> {
        self.check_failure()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(owner, _)| owner == account)
            .map(|(_, key)| key.clone())
            .collect())
    }
}
