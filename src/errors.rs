use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Keyhold.
#[derive(Debug, Error)]
pub enum KeyholdError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Deliberately covers both cases: the caller must not be able to
    /// tell a bad password apart from a tampered blob.
    #[error("Unprotect failed — wrong password or corrupted data")]
    WrongPasswordOrCorrupt,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Store errors ---
    #[error("Keystore not found at {0}")]
    StoreNotFound(PathBuf),

    #[error("Keystore already exists at {0}")]
    StoreAlreadyExists(PathBuf),

    #[error("Malformed keystore: {0}")]
    MalformedStore(String),

    #[error("Integrity check failed — keystore file may be tampered or the password is wrong")]
    IntegrityMismatch,

    #[error("HMAC error: {0}")]
    HmacError(String),

    // --- Entry errors ---
    #[error("Entry '{0}' not found")]
    EntryNotFound(String),

    #[error("Entry '{alias}' is a {found} entry and holds no certificate")]
    WrongEntryType { alias: String, found: &'static str },

    #[error("Certificate chain for '{0}' cannot be empty")]
    EmptyChain(String),

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for Keyhold results.
pub type Result<T> = std::result::Result<T, KeyholdError>;
