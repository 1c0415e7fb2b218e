//! AES-256-GCM sealing for secrets at rest.
//!
//! [`EncryptionService`] seals a plaintext into a single self-contained blob
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`. Every call to
//! [`EncryptionService::seal`] draws a fresh random nonce, so sealing the same
//! plaintext twice never yields the same bytes.
//!
//! ```rust
//! use inboxkit_common::crypto::EncryptionService;
//!
//! let service = EncryptionService::new(&EncryptionService::generate_key())?;
//! let sealed = service.seal(b"sensitive data")?;
//! assert_eq!(service.open(&sealed)?, b"sensitive data");
//! # Ok::<(), inboxkit_common::crypto::CryptoError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Errors from sealing, opening and key derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("sealed payload is too short ({0} bytes)")]
    Truncated(usize),

    /// Authentication tag mismatch: wrong key or tampered ciphertext.
    #[error("decryption failed: authentication tag mismatch")]
    Authentication,

    #[error("encryption failed")]
    Encryption,
}

/// AES-256-GCM encryption service bound to one key.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyLength` for any other key size.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Generate a random 32-byte symmetric key.
    #[must_use]
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Seal `plaintext` into `nonce || ciphertext || tag`.
    ///
    /// # Errors
    /// Returns `CryptoError::Encryption` if the cipher rejects the input.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CryptoError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a blob produced by [`Self::seal`].
    ///
    /// # Errors
    /// - `CryptoError::Truncated` when the blob cannot hold a nonce and tag
    /// - `CryptoError::Authentication` on a wrong key or modified bytes
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Truncated(sealed.len()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }
}
