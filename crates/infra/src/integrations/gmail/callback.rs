//! Loopback HTTP listener that captures the OAuth authorization redirect.
//!
//! The listener serves a single route, `/callback`, on `127.0.0.1`. The first
//! request to reach it decides the outcome; every later request gets an
//! "already completed" page and is otherwise ignored.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use inboxkit_common::auth::validate_state;
use inboxkit_domain::constants::{CALLBACK_PATH, CALLBACK_SHUTDOWN_GRACE_SECS};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Complete</title></head>
<body><h1>Authorization Successful</h1><p>You can close this window and return to the terminal.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization Failed</h1><p>Return to the terminal for details.</p></body>
</html>"#;

const ALREADY_COMPLETED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Already Completed</title></head>
<body><h1>Already Completed</h1><p>This login has already been handled. You can close this window.</p></body>
</html>"#;

/// Errors produced while waiting for the authorization redirect.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("failed to bind OAuth callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The provider redirected back with `error=...`.
    #[error("authorization denied by provider: {error}: {description}")]
    Provider { error: String, description: String },

    #[error("callback carried neither an authorization code nor an error")]
    MissingCode,

    #[error("callback state does not match the authorization request")]
    StateMismatch,

    #[error("timed out after {}s waiting for authorization", .0.as_secs())]
    Timeout(Duration),

    #[error("authorization was cancelled")]
    Cancelled,

    #[error("callback listener stopped before a callback arrived")]
    Closed,

    #[error("callback result was already consumed")]
    AlreadyConsumed,
}

type CallbackOutcome = Result<String, CallbackError>;

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
    expected_state: Arc<Mutex<Option<String>>>,
}

/// Local listener for the provider's redirect.
pub struct CallbackServer {
    port: u16,
    result_rx: Option<oneshot::Receiver<CallbackOutcome>>,
    expected_state: Arc<Mutex<Option<String>>>,
    cancel: CancellationToken,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Start listening on `127.0.0.1:<preferred_port>`, falling back to an
    /// OS-assigned port when the preferred one cannot be bound.
    ///
    /// Returns as soon as the socket is bound; the server runs on a spawned
    /// task.
    ///
    /// # Errors
    /// `CallbackError::Bind` when even the ephemeral port cannot be bound.
    pub async fn start(preferred_port: u16) -> Result<Self, CallbackError> {
        Self::start_with_cancellation(preferred_port, CancellationToken::new()).await
    }

    /// Like [`Self::start`], with waits aborted when `cancel` fires.
    ///
    /// # Errors
    /// `CallbackError::Bind` when even the ephemeral port cannot be bound.
    pub async fn start_with_cancellation(
        preferred_port: u16,
        cancel: CancellationToken,
    ) -> Result<Self, CallbackError> {
        let listener = bind_loopback(preferred_port).await?;
        let addr = listener
            .local_addr()
            .map_err(|source| CallbackError::Bind { addr: loopback(preferred_port), source })?;

        let (result_tx, result_rx) = oneshot::channel();
        let expected_state = Arc::new(Mutex::new(None));
        let state = CallbackState {
            sender: Arc::new(Mutex::new(Some(result_tx))),
            expected_state: Arc::clone(&expected_state),
        };

        let app = Router::new().route(CALLBACK_PATH, get(handle_callback)).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "OAuth callback server error");
            }
        });

        info!(port = addr.port(), "OAuth callback listener started");

        Ok(Self {
            port: addr.port(),
            result_rx: Some(result_rx),
            expected_state,
            cancel,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `http://localhost:<port>`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Redirect URI to register in the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.base_url())
    }

    /// Reject callbacks whose `state` differs from `state`.
    pub fn set_expected_state(&self, state: impl Into<String>) {
        *self.expected_state.lock() = Some(state.into());
    }

    /// Token that aborts [`Self::wait_for_callback`] when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the first callback, the deadline, or cancellation, whichever
    /// comes first.
    ///
    /// # Errors
    /// - `Provider`, `MissingCode`, `StateMismatch` from the callback itself
    /// - `Timeout` when `timeout` elapses
    /// - `Cancelled` when the cancellation token fires
    /// - `Closed` when the listener stopped first
    /// - `AlreadyConsumed` on a second call
    pub async fn wait_for_callback(&mut self, timeout: Duration) -> Result<String, CallbackError> {
        let rx = self.result_rx.take().ok_or(CallbackError::AlreadyConsumed)?;

        tokio::select! {
            outcome = rx => outcome.unwrap_or(Err(CallbackError::Closed)),
            () = tokio::time::sleep(timeout) => Err(CallbackError::Timeout(timeout)),
            () = self.cancel.cancelled() => Err(CallbackError::Cancelled),
        }
    }

    /// Shut the listener down, aborting it if in-flight connections outlive
    /// the grace period. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut handle) = self.handle.take() else {
            return;
        };

        let grace = Duration::from_secs(CALLBACK_SHUTDOWN_GRACE_SECS);
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => debug!(port = self.port, "OAuth callback listener stopped"),
            Ok(Err(err)) => warn!(error = %err, "OAuth callback listener task failed"),
            Err(_) => {
                warn!(port = self.port, "OAuth callback listener did not drain in time, aborting");
                handle.abort();
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

async fn bind_loopback(preferred_port: u16) -> Result<TcpListener, CallbackError> {
    if preferred_port != 0 {
        match TcpListener::bind(loopback(preferred_port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                warn!(port = preferred_port, error = %err, "Preferred callback port unavailable, using an ephemeral port");
            }
        }
    }

    let addr = loopback(0);
    TcpListener::bind(addr).await.map_err(|source| CallbackError::Bind { addr, source })
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let Some(sender) = state.sender.lock().take() else {
        debug!("Ignoring callback after completion");
        return Html(ALREADY_COMPLETED_PAGE);
    };

    let expected = state.expected_state.lock().clone();
    let outcome = classify(&params, expected.as_deref());
    let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };

    if let Err(err) = &outcome {
        warn!(error = %err, "OAuth callback rejected");
    }
    // The waiter may already have timed out and dropped the receiver.
    let _ = sender.send(outcome);

    Html(page)
}

fn classify(params: &HashMap<String, String>, expected_state: Option<&str>) -> CallbackOutcome {
    if let Some(expected) = expected_state {
        match params.get("state") {
            Some(actual) if validate_state(expected, actual) => {}
            _ => return Err(CallbackError::StateMismatch),
        }
    }

    if let Some(error) = params.get("error") {
        return Err(CallbackError::Provider {
            error: error.clone(),
            description: params.get("error_description").cloned().unwrap_or_default(),
        });
    }

    params.get("code").filter(|code| !code.is_empty()).cloned().ok_or(CallbackError::MissingCode)
}
