//! Logging setup
//!
//! [`init_tracing`] installs the global `tracing` subscriber: an `EnvFilter`
//! built from [`LoggingConfig::level`] (itself overridable through
//! `INBOXKIT_LOG`) and a text or JSON `fmt` layer writing to stderr.
//!
//! Library code only emits events; binaries call `init_tracing` once at
//! startup.

use inboxkit_domain::{InboxKitError, LogFormat, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the filter for `config`.
///
/// # Errors
/// `InboxKitError::Config` when the directive does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.level)
        .map_err(|e| InboxKitError::Config(format!("Invalid log filter '{}': {e}", config.level)))
}

/// Install the global subscriber.
///
/// # Errors
/// - `InboxKitError::Config` for an invalid filter directive
/// - `InboxKitError::Internal` when a global subscriber is already set
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
    };

    installed.map_err(|e| InboxKitError::Internal(format!("Tracing already initialized: {e}")))
}
