//! Configuration structures
//!
//! Only the pieces of client configuration the authentication subsystem
//! consumes: OAuth client credentials, redirect port, credential storage and
//! logging.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, DEFAULT_REDIRECT_PORT};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OAuth client settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Preferred loopback port; an ephemeral port is used when it is taken
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    /// Requested scopes; empty means the provider defaults
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Overall deadline for the interactive login
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: Vec::new(),
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_port", &self.redirect_port)
            .field("scopes", &self.scopes)
            .field("auth_timeout_secs", &self.auth_timeout_secs)
            .finish()
    }
}

const fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

const fn default_auth_timeout_secs() -> u64 {
    DEFAULT_AUTH_TIMEOUT_SECS
}

/// Credential storage backend choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS vault when it answers, encrypted file otherwise
    #[default]
    Auto,
    Keyring,
    File,
}

impl fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Keyring => write!(f, "keyring"),
            Self::File => write!(f, "file"),
        }
    }
}

impl FromStr for CredentialBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            _ => Err(format!("Invalid CredentialBackend: {s}")),
        }
    }
}

/// Credential storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub backend: CredentialBackend,
    /// Directory for encrypted credential files; platform default when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `inboxkit_infra=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::default() }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"auth":{"client_id":"id","client_secret":"secret"}}"#).unwrap();

        assert_eq!(config.auth.redirect_port, DEFAULT_REDIRECT_PORT);
        assert_eq!(config.auth.auth_timeout_secs, DEFAULT_AUTH_TIMEOUT_SECS);
        assert!(config.auth.scopes.is_empty());
        assert_eq!(config.credentials.backend, CredentialBackend::Auto);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("FILE".parse::<CredentialBackend>().unwrap(), CredentialBackend::File);
        assert_eq!(CredentialBackend::Keyring.to_string(), "keyring");
        assert!("cloud".parse::<CredentialBackend>().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", AuthConfig::new("id", "very-secret"));
        assert!(!rendered.contains("very-secret"));
    }
}
