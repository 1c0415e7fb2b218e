//! Host and user identity mixed into file-store keys.
//!
//! Binding the key to `hostname/user` means a credential file copied to
//! another machine or account cannot be decrypted there. It is not a
//! passphrase and offers no protection against the same user on the same
//! host.
//!
//! The user name comes from the OS account database, so the fingerprint is
//! the same under a login shell, cron or a service manager.

/// Environment variables consulted only when the account lookup fails.
const USER_ENV_VARS: [&str; 3] = ["USER", "USERNAME", "LOGNAME"];

/// Fingerprint of the current machine and OS user, `"<hostname>/<user>"`.
///
/// Missing values degrade to fixed placeholders so the fingerprint stays
/// stable across runs on the same host.
#[must_use]
pub fn machine_fingerprint() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string());

    format!("{host}/{}", os_user())
}

fn os_user() -> String {
    whoami::fallible::username()
        .ok()
        .filter(|name| !name.is_empty())
        .or_else(|| {
            USER_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
        })
        .unwrap_or_else(|| "unknown-user".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let first = machine_fingerprint();
        assert_eq!(first, machine_fingerprint());
        assert!(first.contains('/'));
    }

    /// Validates that a stripped environment (cron, systemd) keeps the key.
    ///
    /// Assertions:
    /// - Removing the user variables does not change the fingerprint.
    /// - The user part is a real name, not the placeholder.
    #[cfg(unix)]
    #[test]
    fn test_fingerprint_ignores_user_environment() {
        let before = machine_fingerprint();

        let saved: Vec<_> = USER_ENV_VARS.iter().map(|var| (*var, std::env::var_os(var))).collect();
        for var in USER_ENV_VARS {
            std::env::remove_var(var);
        }
        let stripped = machine_fingerprint();
        for (var, value) in saved {
            if let Some(value) = value {
                std::env::set_var(var, value);
            }
        }

        assert_eq!(before, stripped);
        assert!(!stripped.ends_with("/unknown-user"), "got {stripped}");
    }
}
