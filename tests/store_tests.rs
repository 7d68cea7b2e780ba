//! Integration tests for the Keyhold store module.

use std::fs;

use keyhold::crypto::kdf::Argon2Params;
use keyhold::errors::KeyholdError;
use keyhold::store::{Certificate, KeyStore, PlainEntry};
use tempfile::TempDir;

/// Helper: create a temporary keystore file path inside a fresh temp dir.
fn store_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.keyhold");
    (dir, path)
}

/// Cheap Argon2 parameters so tests stay fast.
fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

fn new_store(path: &std::path::Path, password: &[u8]) -> KeyStore {
    KeyStore::create(path, "keyhold", password, Some(&fast_params()), false)
        .expect("create keystore")
}

fn cert(tag: u8) -> Certificate {
    Certificate::new("X.509", vec![tag; 64]).unwrap()
}

// ---------------------------------------------------------------------------
// Create, save, and re-open round-trip
// ---------------------------------------------------------------------------

#[test]
fn create_save_and_reopen_all_entry_kinds() {
    let (_dir, path) = store_path();
    let password = b"store-password";

    let mut store = new_store(&path, password);
    store
        .set_secret_entry("session", b"raw secret key", b"secret-pw")
        .unwrap();
    store
        .set_key_entry(
            "server",
            b"private key bytes",
            b"key-pw",
            &[cert(1), cert(2)],
        )
        .unwrap();
    store.set_certificate_entry("ca", cert(9)).unwrap();
    store.save().unwrap();

    let store2 = KeyStore::open(&path, password).expect("open keystore");
    assert_eq!(store2.store_type(), "keyhold");
    assert_eq!(store2.entry_count(), 3);
    assert_eq!(store2.aliases(), vec!["ca", "server", "session"]);

    match store2.get_entry("session", b"secret-pw").unwrap() {
        PlainEntry::Secret { plaintext } => assert_eq!(*plaintext, b"raw secret key"),
        _ => panic!("expected a secret entry"),
    }

    match store2.get_entry("server", b"key-pw").unwrap() {
        PlainEntry::PrivateKey { key, chain } => {
            assert_eq!(*key, b"private key bytes");
            assert_eq!(chain, vec![cert(1), cert(2)]);
        }
        _ => panic!("expected a private-key entry"),
    }

    match store2.get_entry("ca", b"ignored").unwrap() {
        PlainEntry::TrustedCert { certificate } => assert_eq!(certificate, cert(9)),
        _ => panic!("expected a trusted-certificate entry"),
    }
}

/// The scenario from the original tool: create with password "abc123",
/// store a certificate under "root", save, reopen, read it back
/// byte-equal.
#[test]
fn trusted_certificate_survives_reopen_byte_equal() {
    let (_dir, path) = store_path();

    let cert_x = Certificate::new("X.509", b"certificate-der-bytes".to_vec()).unwrap();

    let mut store = new_store(&path, b"abc123");
    store
        .set_certificate_entry("root", cert_x.clone())
        .unwrap();
    store.save().unwrap();

    let store2 = KeyStore::open(&path, b"abc123").unwrap();
    let loaded = store2.get_certificate("root").unwrap();
    assert_eq!(loaded.encoded, cert_x.encoded);
    assert_eq!(loaded.format, "X.509");
}

// ---------------------------------------------------------------------------
// Password and tamper failures
// ---------------------------------------------------------------------------

#[test]
fn open_with_wrong_password_fails_integrity() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"correct-pw");
    store.set_certificate_entry("ca", cert(3)).unwrap();
    store.save().unwrap();

    let result = KeyStore::open(&path, b"wrong-pw");
    assert!(
        matches!(result, Err(KeyholdError::IntegrityMismatch)),
        "wrong store password must fail the digest check, nothing partial"
    );
}

#[test]
fn get_entry_with_wrong_entry_password_fails() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store
        .set_secret_entry("token", b"sensitive", b"entry-pw")
        .unwrap();

    let result = store.get_entry("token", b"not-the-entry-pw");
    assert!(matches!(result, Err(KeyholdError::WrongPasswordOrCorrupt)));
}

#[test]
fn single_byte_tamper_is_detected() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store
        .set_secret_entry("token", b"sensitive", b"entry-pw")
        .unwrap();
    store.save().unwrap();

    let original = fs::read(&path).unwrap();

    // Flip one byte in the middle of the entry region (well past the
    // 9-byte prefix, well before the 32-byte trailing HMAC).
    let mut tampered = original.clone();
    let index = tampered.len() / 2;
    tampered[index] ^= 0x01;
    fs::write(&path, &tampered).unwrap();

    let result = KeyStore::open(&path, b"store-pw");
    assert!(
        matches!(
            result,
            Err(KeyholdError::IntegrityMismatch) | Err(KeyholdError::MalformedStore(_))
        ),
        "a flipped byte must never decode into a differing store"
    );
}

#[test]
fn truncated_file_is_malformed() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_certificate_entry("ca", cert(7)).unwrap();
    store.save().unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..8]).unwrap();

    let result = KeyStore::open(&path, b"store-pw");
    assert!(matches!(result, Err(KeyholdError::MalformedStore(_))));
}

#[test]
fn open_missing_file_is_not_found() {
    let (_dir, path) = store_path();
    let result = KeyStore::open(&path, b"pw");
    assert!(matches!(result, Err(KeyholdError::StoreNotFound(_))));
}

// ---------------------------------------------------------------------------
// Alias semantics
// ---------------------------------------------------------------------------

#[test]
fn setting_existing_alias_overwrites() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_secret_entry("k", b"first", b"pw").unwrap();
    store.set_secret_entry("k", b"second", b"pw").unwrap();

    assert_eq!(store.entry_count(), 1);
    match store.get_entry("k", b"pw").unwrap() {
        PlainEntry::Secret { plaintext } => assert_eq!(*plaintext, b"second"),
        _ => panic!("expected a secret entry"),
    }
}

#[test]
fn overwrite_can_change_entry_kind() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_secret_entry("slot", b"secret", b"pw").unwrap();
    store.set_certificate_entry("slot", cert(4)).unwrap();

    assert_eq!(store.entry_count(), 1);
    assert_eq!(store.get_certificate("slot").unwrap(), &cert(4));
}

#[test]
fn aliases_are_case_sensitive() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_certificate_entry("Root", cert(1)).unwrap();
    store.set_certificate_entry("root", cert(2)).unwrap();

    assert_eq!(store.entry_count(), 2);
    assert_eq!(store.get_certificate("Root").unwrap(), &cert(1));
    assert_eq!(store.get_certificate("root").unwrap(), &cert(2));
}

#[test]
fn empty_alias_rejected() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    let result = store.set_secret_entry("", b"value", b"pw");
    assert!(matches!(result, Err(KeyholdError::InvalidAlias(_))));
}

#[test]
fn delete_then_get_is_not_found() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_secret_entry("k", b"value", b"pw").unwrap();

    store.delete_entry("k").unwrap();
    let result = store.get_entry("k", b"pw");
    assert!(matches!(result, Err(KeyholdError::EntryNotFound(_))));
}

#[test]
fn delete_unknown_alias_is_not_found() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    let result = store.delete_entry("ghost");
    assert!(matches!(result, Err(KeyholdError::EntryNotFound(_))));
}

// ---------------------------------------------------------------------------
// Private-key entries
// ---------------------------------------------------------------------------

#[test]
fn empty_chain_rejected_and_no_entry_created() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    let result = store.set_key_entry("server", b"key", b"pw", &[]);

    assert!(matches!(result, Err(KeyholdError::EmptyChain(_))));
    assert!(!store.contains_alias("server"));
}

#[test]
fn get_certificate_returns_leaf_of_key_entry() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    let leaf = cert(1);
    store
        .set_key_entry("server", b"key", b"pw", &[leaf.clone(), cert(2), cert(3)])
        .unwrap();

    assert_eq!(store.get_certificate("server").unwrap(), &leaf);
}

#[test]
fn get_certificate_on_secret_entry_is_wrong_type() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_secret_entry("k", b"value", b"pw").unwrap();

    let result = store.get_certificate("k");
    assert!(matches!(result, Err(KeyholdError::WrongEntryType { .. })));
}

// ---------------------------------------------------------------------------
// Persistence semantics
// ---------------------------------------------------------------------------

#[test]
fn unsaved_mutations_do_not_reach_disk() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_certificate_entry("saved", cert(1)).unwrap();
    store.save().unwrap();

    // Mutate without saving.
    store.set_certificate_entry("unsaved", cert(2)).unwrap();
    store.delete_entry("saved").unwrap();

    // The file still holds only the saved state.
    let reopened = KeyStore::open(&path, b"store-pw").unwrap();
    assert_eq!(reopened.aliases(), vec!["saved"]);
}

#[test]
fn create_is_unsaved_until_save() {
    let (_dir, path) = store_path();

    let _store = new_store(&path, b"store-pw");
    assert!(!path.exists(), "create must not write until save is called");
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let (dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_certificate_entry("ca", cert(5)).unwrap();
    store.save().unwrap();
    store.set_certificate_entry("ca2", cert(6)).unwrap();
    store.save().unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp file must be renamed away");
}

#[test]
fn create_over_existing_file_requires_overwrite() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.save().unwrap();

    let result = KeyStore::create(&path, "keyhold", b"other-pw", Some(&fast_params()), false);
    assert!(matches!(result, Err(KeyholdError::StoreAlreadyExists(_))));

    // With overwrite accepted, a fresh empty store replaces the old
    // one once saved.
    let mut replacement =
        KeyStore::create(&path, "keyhold", b"other-pw", Some(&fast_params()), true).unwrap();
    replacement.save().unwrap();
    let reopened = KeyStore::open(&path, b"other-pw").unwrap();
    assert_eq!(reopened.entry_count(), 0);
}

// ---------------------------------------------------------------------------
// Destroy
// ---------------------------------------------------------------------------

#[test]
fn destroy_removes_file_and_consumes_store() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_certificate_entry("ca", cert(1)).unwrap();
    store.save().unwrap();
    assert!(path.exists());

    store.destroy().unwrap();
    assert!(!path.exists());

    let result = KeyStore::open(&path, b"store-pw");
    assert!(matches!(result, Err(KeyholdError::StoreNotFound(_))));
}

#[test]
fn destroy_with_missing_file_is_not_an_error() {
    let (_dir, path) = store_path();

    // Never saved, so there is no file to remove.
    let store = new_store(&path, b"store-pw");
    store.destroy().unwrap();
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[test]
fn list_entries_reports_kinds_sorted() {
    let (_dir, path) = store_path();

    let mut store = new_store(&path, b"store-pw");
    store.set_secret_entry("b-secret", b"v", b"pw").unwrap();
    store.set_certificate_entry("a-cert", cert(1)).unwrap();
    store
        .set_key_entry("c-key", b"k", b"pw", &[cert(2)])
        .unwrap();

    let list = store.list_entries();
    let summary: Vec<(&str, &str)> = list
        .iter()
        .map(|m| (m.alias.as_str(), m.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a-cert", "trusted-certificate"),
            ("b-secret", "secret"),
            ("c-key", "private-key"),
        ]
    );
}
