//! Conversions from infrastructure and subsystem errors into domain errors.

use inboxkit_common::auth::{OAuthClientError, TokenManagerError};
use inboxkit_common::security::StoreError;
use inboxkit_domain::InboxKitError;
use reqwest::Error as HttpError;

use crate::integrations::gmail::{AuthFlowError, CallbackError, ProfileError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub InboxKitError);

impl From<InfraError> for InboxKitError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<InboxKitError> for InfraError {
    fn from(value: InboxKitError) -> Self {
        Self(value)
    }
}

trait IntoInboxKitError {
    fn into_inboxkit(self) -> InboxKitError;
}

macro_rules! infra_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for InfraError {
                fn from(value: $source) -> Self {
                    Self(value.into_inboxkit())
                }
            }
        )+
    };
}

macro_rules! domain_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for InboxKitError {
                fn from(value: $source) -> Self {
                    value.into_inboxkit()
                }
            }
        )+
    };
}

infra_error_from!(
    HttpError,
    OAuthClientError,
    StoreError,
    TokenManagerError,
    CallbackError,
    ProfileError,
    AuthFlowError,
);

// Only errors defined in this crate can convert straight into the domain
// error; the rest go through `InfraError`.
domain_error_from!(CallbackError, ProfileError, AuthFlowError);

/* -------------------------------------------------------------------------- */
/* reqwest::Error → InboxKitError */
/* -------------------------------------------------------------------------- */

impl IntoInboxKitError for HttpError {
    fn into_inboxkit(self) -> InboxKitError {
        if self.is_timeout() {
            return InboxKitError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return InboxKitError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), status.canonical_reason().unwrap_or("unknown status"));
        }

        if self.is_decode() {
            return InboxKitError::Internal(format!("malformed HTTP response: {self}"));
        }

        InboxKitError::Network(self.to_string())
    }
}

fn status_error(code: u16, detail: &str) -> InboxKitError {
    let message = format!("HTTP {code} {detail}");
    match code {
        401 | 403 => InboxKitError::Auth(message),
        404 => InboxKitError::NotFound(message),
        _ => InboxKitError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* OAuth provider errors */
/* -------------------------------------------------------------------------- */

impl IntoInboxKitError for OAuthClientError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            Self::RequestFailed(e) => e.into_inboxkit(),
            Self::OAuthError(e) => InboxKitError::Auth(e.to_string()),
            Self::ParseError(msg) => {
                InboxKitError::Internal(format!("malformed token response: {msg}"))
            }
            Self::ConfigError(msg) => InboxKitError::Config(msg),
            err @ (Self::NoRefreshToken | Self::RefreshFailed(_)) => {
                InboxKitError::ReauthRequired(err.to_string())
            }
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Secret store errors */
/* -------------------------------------------------------------------------- */

impl IntoInboxKitError for StoreError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            err @ Self::NotFound { .. } => InboxKitError::NotFound(err.to_string()),
            err @ (Self::Corrupted { .. } | Self::Io { .. }) => {
                InboxKitError::Storage(err.to_string())
            }
            err @ (Self::AccessFailed(_) | Self::Unavailable(_)) => {
                InboxKitError::Security(err.to_string())
            }
        }
    }
}

impl IntoInboxKitError for TokenManagerError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            err @ Self::NotFound(_) => InboxKitError::ReauthRequired(err.to_string()),
            err @ Self::ScopesNotSet(_) => InboxKitError::NotFound(err.to_string()),
            err @ Self::Malformed { .. } => InboxKitError::Storage(err.to_string()),
            Self::Store(e) => e.into_inboxkit(),
            Self::OAuth(e) => e.into_inboxkit(),
            err @ Self::Task(_) => InboxKitError::Internal(err.to_string()),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Login flow errors */
/* -------------------------------------------------------------------------- */

impl IntoInboxKitError for CallbackError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            err @ Self::Bind { .. } => InboxKitError::Network(err.to_string()),
            err @ (Self::Provider { .. } | Self::MissingCode) => {
                InboxKitError::Auth(err.to_string())
            }
            err @ Self::StateMismatch => InboxKitError::Security(err.to_string()),
            err @ Self::Timeout(_) => InboxKitError::Timeout(err.to_string()),
            err @ Self::Cancelled => InboxKitError::Cancelled(err.to_string()),
            err @ (Self::Closed | Self::AlreadyConsumed) => {
                InboxKitError::Internal(err.to_string())
            }
        }
    }
}

impl IntoInboxKitError for ProfileError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            Self::Request(e) => e.into_inboxkit(),
            Self::Status { status, body } => status_error(status, &body),
            err @ Self::MissingEmail => InboxKitError::Auth(err.to_string()),
        }
    }
}

impl IntoInboxKitError for AuthFlowError {
    fn into_inboxkit(self) -> InboxKitError {
        match self {
            Self::InvalidConfig(msg) => InboxKitError::Config(msg),
            Self::Callback(e) => e.into_inboxkit(),
            Self::Exchange(e) => e.into_inboxkit(),
            Self::Identity(e) => e.into_inboxkit(),
            Self::Storage(e) => e.into_inboxkit(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
