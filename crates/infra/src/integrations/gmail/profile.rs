//! Identity lookup: the Gmail profile's email address names the account.

use inboxkit_common::auth::Token;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("profile request returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("profile response has no email address")]
    MissingEmail,
}

/// Subset of `users.getProfile`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailProfile {
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub messages_total: Option<u64>,
    #[serde(default)]
    pub threads_total: Option<u64>,
    #[serde(default)]
    pub history_id: Option<String>,
}

/// Fetch the profile of the user `token` belongs to.
///
/// # Errors
/// `Request` on transport or decode failure, `Status` on a non-2xx response,
/// `MissingEmail` when the profile carries no address.
pub async fn fetch_profile(
    client: &Client,
    profile_url: &str,
    token: &Token,
) -> Result<GmailProfile, ProfileError> {
    let response =
        client.get(profile_url).header("Authorization", token.authorization_header()).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProfileError::Status { status: status.as_u16(), body });
    }

    let profile: GmailProfile = response.json().await?;
    if profile.email_address.trim().is_empty() {
        return Err(ProfileError::MissingEmail);
    }

    tracing::debug!(account = %profile.email_address, "Resolved account identity");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn token() -> Token {
        Token::new("access-123".to_string(), None, 3600)
    }

    #[tokio::test]
    async fn returns_email_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .and(header("Authorization", "Bearer access-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "emailAddress": "user@example.com",
                "messagesTotal": 12,
                "threadsTotal": 7,
                "historyId": "991"
            })))
            .mount(&server)
            .await;

        let profile = fetch_profile(&Client::new(), &format!("{}/profile", server.uri()), &token())
            .await
            .unwrap();
        assert_eq!(profile.email_address, "user@example.com");
        assert_eq!(profile.messages_total, Some(12));
    }

    #[tokio::test]
    async fn unauthorized_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let err = fetch_profile(&Client::new(), &server.uri(), &token()).await.unwrap_err();
        assert!(matches!(err, ProfileError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn empty_email_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = fetch_profile(&Client::new(), &server.uri(), &token()).await.unwrap_err();
        assert!(matches!(err, ProfileError::MissingEmail));
    }
}
