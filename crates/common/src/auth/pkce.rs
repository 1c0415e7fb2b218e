//! PKCE (Proof Key for Code Exchange) for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` method. A fresh verifier, challenge
//! and CSRF state are produced for every authorization attempt.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a verifier or state value.
const RANDOM_BYTES: usize = 32;

/// The only challenge method this crate emits.
pub const CHALLENGE_METHOD: &str = "S256";

fn random_url_safe() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    // OsRng panics if the OS cannot supply entropy; there is no weaker fallback.
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a code verifier: 32 bytes from the OS CSPRNG, base64url without
/// padding (43 characters).
#[must_use]
pub fn generate_code_verifier() -> String {
    random_url_safe()
}

/// Derive the code challenge: `BASE64URL(SHA256(ASCII(verifier)))`.
///
/// Pure and deterministic.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection (43 characters).
#[must_use]
pub fn generate_state() -> String {
    random_url_safe()
}

/// Compare the state sent with the authorization request against the one
/// received on the callback, in constant time.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE values for one authorization attempt.
///
/// `code_verifier` stays in memory until the code exchange and must never be
/// logged; `Debug` redacts it.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Random string (43 chars, base64url), sent only in the token exchange.
    pub code_verifier: String,

    /// SHA-256 of the verifier, sent in the authorization request.
    pub code_challenge: String,

    /// CSRF token that must round-trip through the callback.
    pub state: String,
}

impl PkceChallenge {
    /// Generate a new verifier, challenge and state.
    ///
    /// # Examples
    /// ```
    /// use inboxkit_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 43);
    /// assert_eq!(challenge.challenge_method(), "S256");
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();

        Self { code_verifier, code_challenge, state }
    }

    /// Challenge method, always `S256`.
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("state", &self.state)
            .finish()
    }
}
