//! Secure credential storage
//!
//! - [`SecretStore`]: the storage contract
//! - [`KeyringStore`]: OS credential vault backend
//! - [`EncryptedFileStore`]: encrypted-file fallback backend
//! - [`open_secret_store`]: backend selection

pub mod factory;
pub mod file_store;
pub mod fingerprint;
pub mod keychain;
pub mod traits;

pub use factory::{open_secret_store, BackendPreference, StoreOptions, DEFAULT_SERVICE_NAME};
pub use file_store::EncryptedFileStore;
pub use fingerprint::machine_fingerprint;
pub use keychain::{vault_persists, KeyringStore};
pub use traits::{SecretStore, StoreBackend, StoreError, KNOWN_KEYS, SCOPES_KEY, TOKEN_KEY};
