//! Credential store wiring from configuration.

use inboxkit_common::auth::TokenManager;
use inboxkit_common::security::{open_secret_store, BackendPreference, StoreError, StoreOptions};
use inboxkit_domain::{CredentialBackend, CredentialConfig};

const fn preference(backend: CredentialBackend) -> BackendPreference {
    match backend {
        CredentialBackend::Auto => BackendPreference::Auto,
        CredentialBackend::Keyring => BackendPreference::Keyring,
        CredentialBackend::File => BackendPreference::File,
    }
}

/// Store options for `config`, with the default vault service name.
pub fn store_options(config: &CredentialConfig) -> StoreOptions {
    StoreOptions {
        preference: preference(config.backend),
        directory: config.directory.clone(),
        ..StoreOptions::default()
    }
}

/// Open the configured secret store and wrap it in a [`TokenManager`].
///
/// # Errors
/// Propagates [`open_secret_store`] failures.
pub fn open_token_manager(config: &CredentialConfig) -> Result<TokenManager, StoreError> {
    let store = open_secret_store(&store_options(config))?;
    Ok(TokenManager::new(store))
}
