//! Password-based key derivation using Argon2id.
//!
//! Every protection key in a keystore comes from Argon2id: the
//! whole-store integrity key and each entry's encryption key. The
//! parameters in use are always written next to the salt they were
//! used with, so decoding only ever needs the password.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{KeyholdError, Result};

/// Length of a salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of a derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Upper bounds accepted when parameters are read back from an
/// untrusted blob. A tampered parameter block must not be able to
/// drive the KDF into gigabytes of memory or hours of work.
const MAX_MEMORY_KIB: u32 = 4_194_304; // 4 GiB
const MAX_ITERATIONS: u32 = 64;
const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost parameters.
///
/// Serialized into the store header and into every protected entry
/// blob so the exact same settings are used when re-deriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Check that the parameters sit inside the accepted range.
    ///
    /// Used both when a caller supplies custom parameters and when
    /// parameters are parsed back out of stored bytes.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB || self.memory_kib > MAX_MEMORY_KIB {
            return Err(KeyholdError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be in {MIN_MEMORY_KIB}..={MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 || self.iterations > MAX_ITERATIONS {
            return Err(KeyholdError::KeyDerivationFailed(format!(
                "Argon2 iterations must be in 1..={MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if self.parallelism < 1 || self.parallelism > MAX_PARALLELISM {
            return Err(KeyholdError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be in 1..={MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte key from a password and salt with explicit
/// Argon2id parameters.
///
/// The same password + salt + params always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8], argon2_params: &Argon2Params) -> Result<[u8; KEY_LEN]> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeyholdError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| KeyholdError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
