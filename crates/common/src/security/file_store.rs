//! Encrypted-file secret store
//!
//! Fallback backend for hosts without a usable credential vault. Each account
//! owns one file in the store directory holding every key for that account:
//!
//! ```text
//! {"salt": "<base64, 32 bytes>", "ciphertext": "<base64, nonce || AES-256-GCM>"}
//! ```
//!
//! The decrypted payload is a JSON object mapping key names to base64 bytes.
//! The file key is PBKDF2-HMAC-SHA256 over the application tag, the account
//! and the machine fingerprint, salted with a value that changes on every
//! save.
//!
//! Files written by older releases hold the raw sealed payload with no
//! envelope, keyed by `SHA-256(account)`. They are still read; the next write
//! replaces them with the current format.
//!
//! Reads of an unreadable file fail with `Corrupted`. Writes and deletes move
//! it aside to `<stem>.corrupt` and carry on, so a fresh login can recover.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::fingerprint::machine_fingerprint;
use super::traits::{SecretStore, StoreBackend, StoreError};
use crate::crypto::{derive_key, generate_salt, legacy_key, EncryptionService, PBKDF2_ITERATIONS};

/// Prefix of the PBKDF2 input; changing it orphans every existing file.
const KEY_MATERIAL_TAG: &str = "inboxkit-credential-store";

/// Hex characters of `SHA-256(account)` used in file names.
const FILE_STEM_LEN: usize = 32;

#[serde_as]
#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde_as(as = "Base64")]
    salt: Vec<u8>,
    #[serde_as(as = "Base64")]
    ciphertext: Vec<u8>,
}

#[serde_as]
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Payload {
    #[serde_as(as = "BTreeMap<_, Base64>")]
    entries: BTreeMap<String, Vec<u8>>,
}

/// Secret store writing one encrypted JSON file per account.
pub struct EncryptedFileStore {
    dir: PathBuf,
    fingerprint: String,
    iterations: u32,
    // Serializes read-modify-write cycles inside this process.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("dir", &self.dir)
            .field("fingerprint", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl EncryptedFileStore {
    /// Store rooted at `dir`, keyed to this machine and user.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_fingerprint(dir, machine_fingerprint())
    }

    /// Store rooted at `dir` with an explicit fingerprint.
    pub fn with_fingerprint(dir: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            fingerprint: fingerprint.into(),
            iterations: PBKDF2_ITERATIONS,
            write_lock: Mutex::new(()),
        }
    }

    /// `<config dir>/inboxkit/credentials`, when the platform has a config
    /// directory.
    #[must_use]
    pub fn default_directory() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inboxkit").join("credentials"))
    }

    /// Directory holding the account files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// File holding every key of `account`.
    #[must_use]
    pub fn path_for(&self, account: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(account.as_bytes()));
        self.dir.join(format!("{}.json", &digest[..FILE_STEM_LEN]))
    }

    /// Where an unreadable file for `account` is moved before being replaced.
    #[must_use]
    pub fn quarantine_path_for(&self, account: &str) -> PathBuf {
        self.path_for(account).with_extension("corrupt")
    }

    fn file_key_material(&self, account: &str) -> String {
        format!("{KEY_MATERIAL_TAG}:{account}:{}", self.fingerprint)
    }

    fn read_payload(&self, account: &str) -> Result<Payload, StoreError> {
        let path = self.path_for(account);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Payload::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let plaintext = match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => self.open_envelope(account, &envelope)?,
            Err(_) => Self::open_legacy(account, &bytes)?,
        };

        serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::corrupted(account, format!("invalid payload: {e}")))
    }

    fn open_envelope(&self, account: &str, envelope: &Envelope) -> Result<Vec<u8>, StoreError> {
        let key = derive_key(
            self.file_key_material(account).as_bytes(),
            &envelope.salt,
            self.iterations,
        );
        EncryptionService::new(&key[..])
            .and_then(|service| service.open(&envelope.ciphertext))
            .map_err(|e| StoreError::corrupted(account, e.to_string()))
    }

    fn open_legacy(account: &str, bytes: &[u8]) -> Result<Vec<u8>, StoreError> {
        let key = legacy_key(account);
        let plaintext = EncryptionService::new(&key[..])
            .and_then(|service| service.open(bytes))
            .map_err(|e| {
                StoreError::corrupted(account, format!("unrecognized file format ({e})"))
            })?;

        debug!(account = %account, "Read credential file in legacy format");
        Ok(plaintext)
    }

    /// Payload to rewrite for `account`. An unreadable file is quarantined
    /// and treated as empty.
    fn read_payload_for_write(&self, account: &str) -> Result<Payload, StoreError> {
        match self.read_payload(account) {
            Err(e @ StoreError::Corrupted { .. }) => {
                self.quarantine(account, &e)?;
                Ok(Payload::default())
            }
            other => other,
        }
    }

    fn quarantine(&self, account: &str, cause: &StoreError) -> Result<(), StoreError> {
        let path = self.path_for(account);
        let target = self.quarantine_path_for(account);
        fs::rename(&path, &target).map_err(|source| StoreError::Io { path: path.clone(), source })?;

        warn!(
            account = %account,
            error = %cause,
            moved_to = %target.display(),
            "Moved unreadable credential file aside"
        );
        Ok(())
    }

    fn write_payload(&self, account: &str, payload: &Payload) -> Result<(), StoreError> {
        let path = self.path_for(account);

        if payload.entries.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(account = %account, "Removed empty credential file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StoreError::Io { path, source }),
            };
        }

        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| StoreError::corrupted(account, format!("cannot encode payload: {e}")))?;

        let salt = generate_salt();
        let key = derive_key(self.file_key_material(account).as_bytes(), &salt, self.iterations);
        let ciphertext = EncryptionService::new(&key[..])
            .and_then(|service| service.seal(&plaintext))
            .map_err(|e| StoreError::corrupted(account, e.to_string()))?;

        let envelope = Envelope { salt: salt.to_vec(), ciphertext };
        let contents = serde_json::to_vec(&envelope)
            .map_err(|e| StoreError::corrupted(account, format!("cannot encode envelope: {e}")))?;

        self.write_atomically(&path, &contents)
    }

    fn ensure_directory(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io { path: self.dir.clone(), source };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700)).map_err(io_err)?;
        }
        Ok(())
    }

    fn write_atomically(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        self.ensure_directory()?;
        let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        temp.write_all(contents).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    #[cfg(test)]
    fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

impl SecretStore for EncryptedFileStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::EncryptedFile
    }

    fn set(&self, account: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut payload = self.read_payload_for_write(account)?;
        payload.entries.insert(key.to_string(), value.to_vec());
        self.write_payload(account, &payload)?;

        debug!(account = %account, key = %key, "Stored secret in credential file");
        Ok(())
    }

    fn get(&self, account: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut payload = self.read_payload(account)?;
        payload.entries.remove(key).ok_or_else(|| StoreError::not_found(account, key))
    }

    fn delete(&self, account: &str, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut payload = self.read_payload_for_write(account)?;

        if payload.entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_payload(account, &payload)
    }

    fn list(&self, account: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.read_payload(account)?.entries.into_keys().collect())
    }
}
