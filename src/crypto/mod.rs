//! Cryptographic primitives for Keyhold.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - Master key wrapper and HKDF integrity-key derivation (`keys`)
//! - Self-describing per-entry protection blobs (`protect`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod protect;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{protect, unprotect, derive_key, ...};
pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_key, generate_salt, Argon2Params};
pub use keys::MasterKey;
pub use protect::{protect, unprotect};
