//! Per-entry password protection.
//!
//! `protect` turns (password, plaintext) into a self-describing blob;
//! `unprotect` reverses it given only the password.  Blob layout:
//!
//! ```text
//! [memory_kib: u32 LE][iterations: u32 LE][parallelism: u32 LE]
//! [salt: 32 bytes][nonce: 12 bytes][ciphertext + 16-byte tag]
//! ```
//!
//! The Argon2id parameters and salt ride along with the ciphertext, so
//! decoding never needs out-of-band configuration.  Every decode
//! failure collapses into `WrongPasswordOrCorrupt`: a caller (or an
//! attacker feeding us modified blobs) cannot distinguish a wrong
//! password from tampered bytes.

use zeroize::{Zeroize, Zeroizing};

use crate::errors::{KeyholdError, Result};

use super::encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
use super::kdf::{derive_key, generate_salt, Argon2Params, SALT_LEN};

/// Three little-endian u32 cost parameters.
const PARAMS_LEN: usize = 12;

/// Smallest blob `unprotect` will even look at.
const MIN_BLOB_LEN: usize = PARAMS_LEN + SALT_LEN + NONCE_LEN + TAG_LEN;

/// Protect `plaintext` under `password`.
///
/// Generates a fresh random salt, derives an AES-256 key with the
/// given Argon2id parameters, and encrypts with AES-256-GCM.  The same
/// plaintext protected twice yields different bytes (fresh salt and
/// nonce), but both unprotect to the same plaintext.
pub fn protect(password: &[u8], plaintext: &[u8], params: &Argon2Params) -> Result<Vec<u8>> {
    params.validate()?;

    let salt = generate_salt();
    let mut key = derive_key(password, &salt, params)?;
    let sealed = encrypt(&key, plaintext);
    key.zeroize();
    let sealed = sealed?;

    let mut blob = Vec::with_capacity(PARAMS_LEN + SALT_LEN + sealed.len());
    blob.extend_from_slice(&params.memory_kib.to_le_bytes());
    blob.extend_from_slice(&params.iterations.to_le_bytes());
    blob.extend_from_slice(&params.parallelism.to_le_bytes());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Reverse `protect` given the same password.
///
/// Returns the plaintext wrapped in `Zeroizing` so it is wiped once
/// the caller drops it.
pub fn unprotect(password: &[u8], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < MIN_BLOB_LEN {
        return Err(KeyholdError::WrongPasswordOrCorrupt);
    }

    let params = parse_params(&blob[..PARAMS_LEN])?;
    // Out-of-range parameters mean the blob was modified; report it
    // exactly like a failed tag check.
    params
        .validate()
        .map_err(|_| KeyholdError::WrongPasswordOrCorrupt)?;

    let salt = &blob[PARAMS_LEN..PARAMS_LEN + SALT_LEN];
    let sealed = &blob[PARAMS_LEN + SALT_LEN..];

    let mut key = derive_key(password, salt, &params)
        .map_err(|_| KeyholdError::WrongPasswordOrCorrupt)?;
    let plaintext = decrypt(&key, sealed);
    key.zeroize();

    Ok(Zeroizing::new(plaintext?))
}

fn parse_params(bytes: &[u8]) -> Result<Argon2Params> {
    let word = |i: usize| -> Result<u32> {
        bytes[i * 4..i * 4 + 4]
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| KeyholdError::WrongPasswordOrCorrupt)
    };
    Ok(Argon2Params {
        memory_kib: word(0)?,
        iterations: word(1)?,
        parallelism: word(2)?,
    })
}
