//! OAuth 2.0 authorization code flow with PKCE
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  persistence + refresh-on-demand
//! └────────┬────────┘
//!          │
//!          ├──► OAuthProvider      (auth URL, code exchange, refresh)
//!          │         │
//!          │         └──► RefreshingTokenSource
//!          │
//!          └──► SecretStore        (vault or encrypted file)
//! ```
//!
//! The interactive part of the flow (loopback listener, browser launch) lives
//! in `inboxkit-infra`.
//!
//! # Module Organization
//!
//! - **[`types`]**: `Token`, `ProviderConfig`, `OAuthError`, `TokenInfo`
//! - **[`pkce`]**: PKCE verifier/challenge and CSRF state
//! - **[`client`]**: `OAuthProvider` HTTP client
//! - **[`token_source`]**: refreshing and static token sources
//! - **[`token_manager`]**: token and scope persistence
//!
//! # Security Features
//!
//! - **PKCE (S256)**: prevents authorization code interception
//! - **State Validation**: constant-time CSRF check
//! - **Redacted Debug**: tokens, verifiers and client secrets never appear in
//!   debug output or logs

pub mod client;
pub mod pkce;
pub mod token_manager;
pub mod token_source;
pub mod traits;
pub mod types;

pub use client::{OAuthClientError, OAuthProvider};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, PkceChallenge,
};
pub use token_manager::{PersistingTokenSource, TokenManager, TokenManagerError};
pub use token_source::{RefreshingTokenSource, StaticTokenSource};
pub use traits::TokenSource;
pub use types::{OAuthError, ProviderConfig, Token, TokenInfo, TokenResponse};
