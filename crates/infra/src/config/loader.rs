//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the client credentials are not in the environment, falls back to a
//!    config file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `INBOXKIT_CLIENT_ID`: OAuth client ID (required)
//! - `INBOXKIT_CLIENT_SECRET`: OAuth client secret (required)
//! - `INBOXKIT_REDIRECT_PORT`: preferred loopback port (default 8089)
//! - `INBOXKIT_CREDENTIAL_BACKEND`: `auto`, `keyring` or `file`
//! - `INBOXKIT_CREDENTIAL_DIR`: directory for encrypted credential files
//! - `INBOXKIT_LOG`: log filter directive (default `info`)
//! - `INBOXKIT_LOG_FORMAT`: `text` or `json`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./inboxkit.toml` or `./inboxkit.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The platform config directory (`<config_dir>/inboxkit/config.toml`)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use inboxkit_domain::constants::{
    ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_CREDENTIAL_BACKEND, ENV_CREDENTIAL_DIR, ENV_LOG,
    ENV_LOG_FORMAT, ENV_REDIRECT_PORT,
};
use inboxkit_domain::{
    AuthConfig, Config, CredentialBackend, CredentialConfig, InboxKitError, LogFormat,
    LoggingConfig, Result,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["inboxkit.toml", "inboxkit.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the client
/// credentials are missing there, falls back to loading from a config file.
/// Environment overrides for logging and credential storage apply to a
/// file-loaded configuration too.
///
/// # Errors
/// Returns `InboxKitError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            let mut config = load_from_file(None)?;
            apply_env_overrides(&mut config)?;
            Ok(config)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `InboxKitError::Config` if the client ID or secret is missing or
/// an optional variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let client_id = env_var(ENV_CLIENT_ID)?;
    let client_secret = env_var(ENV_CLIENT_SECRET)?;

    let mut config = Config {
        auth: AuthConfig::new(client_id, client_secret),
        credentials: CredentialConfig::default(),
        logging: LoggingConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply the optional environment variables on top of `config`.
///
/// # Errors
/// Returns `InboxKitError::Config` for an unparsable port, backend or log
/// format.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(port) = env_opt(ENV_REDIRECT_PORT) {
        config.auth.redirect_port = port
            .parse::<u16>()
            .map_err(|e| InboxKitError::Config(format!("Invalid redirect port: {e}")))?;
    }

    if let Some(backend) = env_opt(ENV_CREDENTIAL_BACKEND) {
        config.credentials.backend =
            backend.parse::<CredentialBackend>().map_err(InboxKitError::Config)?;
    }

    if let Some(dir) = env_opt(ENV_CREDENTIAL_DIR) {
        config.credentials.directory = Some(PathBuf::from(dir));
    }

    if let Some(level) = env_opt(ENV_LOG) {
        config.logging.level = level;
    }

    if let Some(format) = env_opt(ENV_LOG_FORMAT) {
        config.logging.format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" | "pretty" => LogFormat::Text,
            other => {
                return Err(InboxKitError::Config(format!("Invalid log format: {other}")));
            }
        };
    }

    Ok(())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `InboxKitError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(InboxKitError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            InboxKitError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| InboxKitError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InboxKitError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InboxKitError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(InboxKitError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Some(config_dir) = dirs::config_dir() {
        dirs.push(config_dir.join("inboxkit"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `InboxKitError::Config` if the variable is unset or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        InboxKitError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Non-empty environment variable, if set.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
