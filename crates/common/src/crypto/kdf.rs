//! Key derivation for the encrypted credential file.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::encryption::KEY_LEN;

/// PBKDF2 iteration count for file keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes; a new salt is drawn on every save.
pub const SALT_LEN: usize = 32;

/// Derive a 256-bit key with PBKDF2-HMAC-SHA256.
#[must_use]
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut key[..]);
    key
}

/// Key used by the salt-less legacy file format: `SHA-256(account)`.
///
/// Only ever used for reading.
#[must_use]
pub fn legacy_key(account: &str) -> Zeroizing<[u8; KEY_LEN]> {
    Zeroizing::new(Sha256::digest(account.as_bytes()).into())
}

/// Draw a fresh random salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
