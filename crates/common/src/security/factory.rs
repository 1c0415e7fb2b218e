//! Secret store selection
//!
//! Picks the OS credential vault when it answers a probe, otherwise the
//! encrypted-file store. The choice is made once and holds for the lifetime
//! of the returned handle.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use super::file_store::EncryptedFileStore;
use super::keychain::KeyringStore;
use super::traits::{SecretStore, StoreError};

/// Default vault service and entry prefix.
pub const DEFAULT_SERVICE_NAME: &str = "inboxkit";

/// Which backend the caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// Vault when available, file otherwise
    #[default]
    Auto,
    /// Vault only; failing the probe is an error
    Keyring,
    /// Encrypted file only
    File,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "keyring" | "keychain" | "vault" => Ok(Self::Keyring),
            "file" | "encrypted-file" => Ok(Self::File),
            other => Err(format!("unknown credential backend '{other}'")),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Keyring => write!(f, "keyring"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Inputs to [`open_secret_store`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Vault service name
    pub service_name: String,
    /// Vault entry prefix
    pub prefix: String,
    pub preference: BackendPreference,
    /// Directory for the file backend; platform default when `None`
    pub directory: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            prefix: DEFAULT_SERVICE_NAME.to_string(),
            preference: BackendPreference::Auto,
            directory: None,
        }
    }
}

/// Open the secret store described by `options`.
///
/// # Errors
/// - `StoreError::Unavailable` when `Keyring` is forced and the vault fails
///   its probe
/// - `StoreError::Unavailable` when the file backend has no directory
pub fn open_secret_store(options: &StoreOptions) -> Result<Arc<dyn SecretStore>, StoreError> {
    match options.preference {
        BackendPreference::Keyring => {
            let store = KeyringStore::open(&options.service_name, &options.prefix)?;
            info!(backend = "keyring", "Using OS credential vault");
            Ok(Arc::new(store))
        }
        BackendPreference::File => open_file_store(options),
        BackendPreference::Auto => match KeyringStore::open(&options.service_name, &options.prefix) {
            Ok(store) => {
                info!(backend = "keyring", "Using OS credential vault");
                Ok(Arc::new(store))
            }
            Err(e) => {
                warn!(error = %e, "Credential vault unavailable, falling back to encrypted file");
                open_file_store(options)
            }
        },
    }
}

fn open_file_store(options: &StoreOptions) -> Result<Arc<dyn SecretStore>, StoreError> {
    let directory = options
        .directory
        .clone()
        .or_else(EncryptedFileStore::default_directory)
        .ok_or_else(|| {
            StoreError::Unavailable("no configuration directory for credential files".to_string())
        })?;

    info!(backend = "encrypted-file", path = %directory.display(), "Using encrypted credential file");
    Ok(Arc::new(EncryptedFileStore::new(directory)))
}
