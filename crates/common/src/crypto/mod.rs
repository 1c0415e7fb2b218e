//! Cryptographic primitives for secrets at rest.

pub mod encryption;
pub mod kdf;

pub use encryption::{CryptoError, EncryptionService};
pub use kdf::{derive_key, generate_salt, legacy_key, PBKDF2_ITERATIONS, SALT_LEN};
