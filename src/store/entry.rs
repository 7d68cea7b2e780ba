//! Entry types stored inside a keystore.
//!
//! A keystore maps an alias to exactly one `Entry`: an opaque
//! protected secret, a private key with its certificate chain, or a
//! trusted certificate.  Byte fields use custom serde helpers so they
//! serialize as base64 strings rather than raw byte arrays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{KeyholdError, Result};

// Re-use the base64 serde helpers from format.rs (no duplication).
use super::format::{base64_decode, base64_encode};

/// An encoded certificate plus the name of its encoding standard.
///
/// The blob is opaque to the keystore: parsing and validation belong
/// to the caller's certificate library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Encoding standard, e.g. "X.509".
    pub format: String,

    /// The encoded certificate bytes (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub encoded: Vec<u8>,
}

impl Certificate {
    /// Build a certificate, rejecting empty blobs and format tags.
    pub fn new(format: impl Into<String>, encoded: Vec<u8>) -> Result<Self> {
        let format = format.into();
        if format.is_empty() {
            return Err(KeyholdError::InvalidEntry(
                "certificate format tag cannot be empty".into(),
            ));
        }
        if encoded.is_empty() {
            return Err(KeyholdError::InvalidEntry(
                "certificate blob cannot be empty".into(),
            ));
        }
        Ok(Self { format, encoded })
    }
}

/// One keystore entry.
///
/// `protected` / `protected_key` bytes are the output of
/// `crypto::protect` and can only be opened with the password the
/// entry was set with.  Certificates are not secret and are stored
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// An opaque protected secret-key blob.
    Secret {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        protected: Vec<u8>,
    },

    /// A protected private key plus its validating chain, leaf first.
    PrivateKey {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        protected_key: Vec<u8>,
        chain: Vec<Certificate>,
    },

    /// A certificate with no associated private material.
    TrustedCert { certificate: Certificate },
}

impl Entry {
    /// Build a secret entry from already-protected bytes.
    pub fn secret(protected: Vec<u8>) -> Result<Self> {
        if protected.is_empty() {
            return Err(KeyholdError::InvalidEntry(
                "protected payload cannot be empty".into(),
            ));
        }
        Ok(Self::Secret { protected })
    }

    /// Build a private-key entry.  The chain is ordered leaf first and
    /// must not be empty; `alias` only feeds the error message.
    pub fn private_key(alias: &str, protected_key: Vec<u8>, chain: Vec<Certificate>) -> Result<Self> {
        if protected_key.is_empty() {
            return Err(KeyholdError::InvalidEntry(
                "protected private key cannot be empty".into(),
            ));
        }
        if chain.is_empty() {
            return Err(KeyholdError::EmptyChain(alias.to_string()));
        }
        Ok(Self::PrivateKey {
            protected_key,
            chain,
        })
    }

    /// Build a trusted-certificate entry.
    pub fn trusted_cert(certificate: Certificate) -> Self {
        Self::TrustedCert { certificate }
    }

    /// Human-readable entry kind, used in listings and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Secret { .. } => "secret",
            Self::PrivateKey { .. } => "private-key",
            Self::TrustedCert { .. } => "trusted-certificate",
        }
    }
}

/// A single aliased record stored in the keystore file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// The alias this entry is stored under (case-sensitive).
    pub alias: String,

    /// The entry itself.
    pub entry: Entry,

    /// When this alias was first set.
    pub created_at: DateTime<Utc>,

    /// When this alias was last overwritten.
    pub updated_at: DateTime<Utc>,
}

/// Lightweight metadata about a record (no protected bytes).
///
/// Returned by `KeyStore::list_entries` so callers can display what a
/// store holds without touching any ciphertext.
#[derive(Debug, Clone)]
pub struct RecordMetadata {
    pub alias: String,
    pub kind: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
