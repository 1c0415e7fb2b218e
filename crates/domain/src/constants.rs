//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Login flow
pub const DEFAULT_REDIRECT_PORT: u16 = 8089;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;
pub const CALLBACK_SHUTDOWN_GRACE_SECS: u64 = 5;
pub const CALLBACK_PATH: &str = "/callback";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Environment variables
pub const ENV_CLIENT_ID: &str = "INBOXKIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "INBOXKIT_CLIENT_SECRET";
pub const ENV_REDIRECT_PORT: &str = "INBOXKIT_REDIRECT_PORT";
pub const ENV_CREDENTIAL_BACKEND: &str = "INBOXKIT_CREDENTIAL_BACKEND";
pub const ENV_CREDENTIAL_DIR: &str = "INBOXKIT_CREDENTIAL_DIR";
pub const ENV_LOG: &str = "INBOXKIT_LOG";
pub const ENV_LOG_FORMAT: &str = "INBOXKIT_LOG_FORMAT";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
