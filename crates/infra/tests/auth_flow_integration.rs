//! End-to-end tests for the interactive login
//!
//! A fake browser follows the authorization URL's redirect straight back to
//! the loopback listener; token and profile endpoints are served by wiremock.

use std::sync::Arc;
use std::time::Duration;

use inboxkit_common::auth::TokenManager;
use inboxkit_common::security::{EncryptedFileStore, SecretStore};
use inboxkit_common::testing::MemorySecretStore;
use inboxkit_domain::InboxKitError;
use inboxkit_infra::integrations::gmail::{
    AuthFlow, AuthFlowError, CallbackError, GmailOAuthSettings, ProfileError,
};
use inboxkit_infra::platform::{BrowserLauncher, ManualBrowser};
use parking_lot::Mutex;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT: &str = "user@example.com";

/// Answers the consent screen with a fixed outcome.
struct ScriptedBrowser {
    /// Extra query for the redirect; `None` means grant with `auth-code`
    denial: Option<&'static str>,
    opened: Mutex<Option<Url>>,
}

impl ScriptedBrowser {
    fn granting() -> Self {
        Self { denial: None, opened: Mutex::new(None) }
    }

    fn denying() -> Self {
        Self {
            denial: Some("error=access_denied&error_description=User%20denied"),
            opened: Mutex::new(None),
        }
    }
}

impl BrowserLauncher for ScriptedBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let parsed = Url::parse(url).map_err(std::io::Error::other)?;
        let param = |name: &str| {
            parsed.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned()).unwrap_or_default()
        };
        let redirect_uri = param("redirect_uri");
        let state = param("state");
        let query = match self.denial {
            Some(denial) => format!("{denial}&state={state}"),
            None => format!("code=auth-code&state={state}"),
        };

        *self.opened.lock() = Some(parsed);
        tokio::spawn(async move {
            let _ = reqwest::get(format!("{redirect_uri}?{query}")).await;
        });
        Ok(())
    }
}

async fn provider_mocks(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("Authorization", "Bearer ya29.access"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "emailAddress": ACCOUNT })),
        )
        .mount(server)
        .await;
}

fn settings(server: &MockServer) -> GmailOAuthSettings {
    let mut settings = GmailOAuthSettings::new("client-id.apps.googleusercontent.com", "client-secret")
        .with_endpoints(
            format!("{}/auth", server.uri()),
            format!("{}/token", server.uri()),
            format!("{}/profile", server.uri()),
        );
    settings.redirect_port = 0;
    settings.auth_timeout = Duration::from_secs(10);
    settings
}

#[tokio::test]
async fn test_full_login_stores_token_under_profile_email() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    provider_mocks(&server).await;

    let dir = TempDir::new()?;
    let store = Arc::new(EncryptedFileStore::with_fingerprint(dir.path(), "test-host:test-user"));
    let manager = TokenManager::new(store.clone());

    let flow = AuthFlow::with_browser(settings(&server), manager.clone(), ScriptedBrowser::granting());
    let outcome = flow.login().await?;

    assert_eq!(outcome.account, ACCOUNT);
    assert_eq!(outcome.token.access_token, "ya29.access");

    let stored = manager.load_token(ACCOUNT)?;
    assert_eq!(stored.access_token, "ya29.access");
    assert_eq!(stored.refresh_token.as_deref(), Some("1//refresh"));
    assert_eq!(manager.get_granted_scopes(ACCOUNT)?, outcome.scopes);
    assert!(store.path_for(ACCOUNT).exists());

    let info = manager.get_token_info(ACCOUNT);
    assert!(info.has_token);
    assert!(info.has_refresh_token);
    assert!(!info.is_expired);
    Ok(())
}

#[tokio::test]
async fn test_authorization_url_carries_pkce_and_offline_access() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    provider_mocks(&server).await;

    let browser = Arc::new(ScriptedBrowser::granting());
    let flow = AuthFlow::with_browser(
        settings(&server),
        TokenManager::new(Arc::new(MemorySecretStore::new())),
        Arc::clone(&browser),
    );
    flow.login().await?;

    let url = browser.opened.lock().clone().expect("browser was opened");
    let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs["response_type"], "code");
    assert_eq!(pairs["code_challenge_method"], "S256");
    assert_eq!(pairs["code_challenge"].len(), 43);
    assert_eq!(pairs["access_type"], "offline");
    assert_eq!(pairs["prompt"], "consent");
    assert!(pairs["redirect_uri"].starts_with("http://localhost:"));
    assert!(pairs["redirect_uri"].ends_with("/callback"));
    Ok(())
}

#[tokio::test]
async fn test_denied_consent_stores_nothing() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let store = Arc::new(MemorySecretStore::new());

    let flow = AuthFlow::with_browser(
        settings(&server),
        TokenManager::new(store.clone()),
        ScriptedBrowser::denying(),
    );

    let err = flow.login().await.unwrap_err();
    match &err {
        AuthFlowError::Callback(CallbackError::Provider { error, description }) => {
            assert_eq!(error, "access_denied");
            assert_eq!(description, "User denied");
        }
        other => panic!("expected provider denial, got {other:?}"),
    }
    assert_eq!(store.write_count(), 0);
    assert!(store.list(ACCOUNT)?.is_empty());

    let mapped: InboxKitError = err.into();
    assert!(matches!(mapped, InboxKitError::Auth(_)));
    Ok(())
}

#[tokio::test]
async fn test_rejected_code_is_exchange_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySecretStore::new());
    let flow = AuthFlow::with_browser(
        settings(&server),
        TokenManager::new(store.clone()),
        ScriptedBrowser::granting(),
    );

    let err = flow.login().await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Exchange(_)), "got {err:?}");
    assert_eq!(store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_slow_profile_lookup_hits_request_timeout() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "emailAddress": ACCOUNT }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let mut settings = settings(&server);
    settings.request_timeout = Duration::from_millis(300);
    let store = Arc::new(MemorySecretStore::new());
    let flow = AuthFlow::with_browser(settings, TokenManager::new(store.clone()), ScriptedBrowser::granting());

    let started = std::time::Instant::now();
    let err = flow.login().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        AuthFlowError::Identity(ProfileError::Request(e)) => assert!(e.is_timeout(), "got {e:?}"),
        other => panic!("expected identity timeout, got {other:?}"),
    }
    assert_eq!(store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_login_times_out_without_callback() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let mut settings = settings(&server);
    settings.auth_timeout = Duration::from_millis(200);

    let flow = AuthFlow::with_browser(
        settings,
        TokenManager::new(Arc::new(MemorySecretStore::new())),
        ManualBrowser,
    );

    let err = flow.login().await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Callback(CallbackError::Timeout(_))));
    Ok(())
}

#[tokio::test]
async fn test_login_can_be_cancelled() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let flow = AuthFlow::with_browser(
        settings(&server),
        TokenManager::new(Arc::new(MemorySecretStore::new())),
        ManualBrowser,
    );

    let cancel = flow.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let err = flow.login().await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Callback(CallbackError::Cancelled)));
    Ok(())
}
