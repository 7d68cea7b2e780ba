//! Master key handling and HKDF sub-key derivation.
//!
//! The store password yields one Argon2id-derived master key.  From it
//! HKDF-SHA256 (RFC 5869) produces the dedicated integrity key used to
//! authenticate the whole keystore file.  Entry encryption keys do not
//! come from here; each entry derives its own key from its own
//! password and salt in `protect`.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{KeyholdError, Result};

use super::kdf::KEY_LEN;

/// HKDF context string binding the integrity key to its purpose.
const INTEGRITY_INFO: &[u8] = b"keyhold-integrity-key";

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// The extract step is skipped and the master key is used directly as
/// the pseudo-random key, because it already has high entropy (it came
/// from Argon2id).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| KeyholdError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derive the keystore integrity (HMAC) key from this master key.
    pub fn derive_integrity_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, INTEGRITY_INFO)
    }
}
