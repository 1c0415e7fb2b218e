//! Authentication and credential storage shared across inboxkit crates.
//!
//! - [`auth`]: OAuth 2.0 + PKCE provider client, token sources, token manager
//! - [`crypto`]: AES-256-GCM sealing and key derivation
//! - [`security`]: secret store trait, vault and encrypted-file backends
//! - `testing`: mocks (feature `test-utils`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod crypto;
pub mod security;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{OAuthProvider, ProviderConfig, Token, TokenManager, TokenManagerError};
pub use security::{open_secret_store, SecretStore, StoreError};
