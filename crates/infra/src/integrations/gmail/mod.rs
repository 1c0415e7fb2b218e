//! Gmail account authorization
//!
//! - [`callback`]: loopback redirect listener
//! - [`profile`]: account identity lookup
//! - [`oauth`]: login orchestration

pub mod callback;
pub mod oauth;
pub mod profile;

pub use callback::{CallbackError, CallbackServer};
pub use oauth::{AuthFlow, AuthFlowError, GmailOAuthSettings, LoginOutcome};
pub use profile::{fetch_profile, GmailProfile, ProfileError};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GMAIL_PROFILE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/profile";

pub const SCOPE_GMAIL_MODIFY: &str = "https://www.googleapis.com/auth/gmail.modify";
pub const SCOPE_GMAIL_SETTINGS: &str = "https://www.googleapis.com/auth/gmail.settings.basic";

/// Scopes requested when configuration names none.
pub fn default_scopes() -> Vec<String> {
    vec![SCOPE_GMAIL_MODIFY.to_string(), SCOPE_GMAIL_SETTINGS.to_string()]
}
