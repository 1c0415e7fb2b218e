//! # inboxkit Infrastructure
//!
//! Impure pieces of account authorization.
//!
//! This crate contains:
//! - The loopback callback listener and interactive Gmail login
//! - Account identity lookup
//! - Browser launching
//! - Configuration loading (env + TOML/JSON files)
//! - Tracing subscriber setup
//! - Conversions from subsystem errors into `InboxKitError`
//!
//! ## Architecture
//! - Builds on `inboxkit-common` (OAuth, token manager, secret stores)
//! - Depends on `inboxkit-domain` for configuration and the domain error
//! - Contains all "impure" code (sockets, browsers, env, files)

pub mod config;
pub mod credentials;
pub mod errors;
pub mod integrations;
pub mod observability;
pub mod platform;

// Re-export commonly used items
pub use credentials::open_token_manager;
pub use errors::InfraError;
pub use integrations::gmail::{AuthFlow, AuthFlowError, CallbackServer, GmailOAuthSettings};
pub use observability::init_tracing;
