//! Integration tests for the encrypted credential file
//!
//! Covers the on-disk contract: envelope layout, per-account files, the
//! legacy read path and corruption handling.

use std::fs;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use inboxkit_common::crypto::{legacy_key, EncryptionService};
use inboxkit_common::security::{EncryptedFileStore, SecretStore, StoreError};
use tempfile::TempDir;

const ACCOUNT: &str = "legacy@example.com";

fn store(dir: &TempDir) -> EncryptedFileStore {
    EncryptedFileStore::with_fingerprint(dir.path(), "ci-host/ci-user")
}

/// Validates reading a file written in the legacy format and its upgrade.
///
/// # Test Steps
/// 1. Write a raw sealed payload keyed by SHA-256(account), no envelope
/// 2. Read the token through the store
/// 3. Set another key and verify the file is now a salted JSON envelope that
///    still holds the legacy token
#[test]
fn test_legacy_file_is_readable_and_upgraded_on_write() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store(&dir);

    let payload = serde_json::json!({ "token": STANDARD.encode(br#"{"access_token":"old"}"#) });
    let sealed = EncryptionService::new(&legacy_key(ACCOUNT)[..])?.seal(&serde_json::to_vec(&payload)?)?;
    fs::write(store.path_for(ACCOUNT), sealed)?;

    assert_eq!(store.get(ACCOUNT, "token")?, br#"{"access_token":"old"}"#);
    assert_eq!(store.list(ACCOUNT)?, vec!["token".to_string()]);

    store.set(ACCOUNT, "scopes", br#"["a"]"#)?;

    let envelope: serde_json::Value = serde_json::from_slice(&fs::read(store.path_for(ACCOUNT))?)?;
    let salt = STANDARD.decode(envelope["salt"].as_str().unwrap_or_default())?;
    assert_eq!(salt.len(), 32);
    assert!(envelope["ciphertext"].is_string());

    assert_eq!(store.get(ACCOUNT, "token")?, br#"{"access_token":"old"}"#);
    assert_eq!(store.get(ACCOUNT, "scopes")?, br#"["a"]"#);
    Ok(())
}

/// Validates that a second store instance on the same host reads what the
/// first wrote (the key depends only on account, fingerprint and salt).
#[test]
fn test_store_reopen_reads_existing_file() -> Result<()> {
    let dir = TempDir::new()?;
    store(&dir).set("user@example.com", "token", b"persisted")?;

    assert_eq!(store(&dir).get("user@example.com", "token")?, b"persisted");
    Ok(())
}

/// Validates that a truncated file is reported as corrupted, never as absent.
#[test]
fn test_truncated_file_is_corrupted() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store(&dir);
    store.set(ACCOUNT, "token", b"value")?;

    let bytes = fs::read(store.path_for(ACCOUNT))?;
    fs::write(store.path_for(ACCOUNT), &bytes[..bytes.len() / 2])?;

    let err = store.get(ACCOUNT, "token").unwrap_err();
    assert!(matches!(err, StoreError::Corrupted { .. }), "got {err:?}");
    assert!(!err.is_not_found());
    Ok(())
}

/// Validates large values round-trip through the file backend.
#[test]
fn test_large_value_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store(&dir);
    let value: Vec<u8> = (0..(1024 * 1024 + 3)).map(|i| (i % 256) as u8).collect();

    store.set(ACCOUNT, "token", &value)?;
    assert_eq!(store.get(ACCOUNT, "token")?, value);
    Ok(())
}
