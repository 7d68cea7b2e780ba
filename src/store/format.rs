//! Binary keystore file format and HMAC integrity verification.
//!
//! A `.keyhold` file has this layout:
//!
//! ```text
//! [KHLD: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON]
//! [entry_count: 4 bytes LE]
//!   ([record_len: 4 bytes LE][record JSON]) * entry_count
//! [HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`KHLD`): identifies the file as a Keyhold keystore.
//! - **Version**: format version (currently `1`); unknown versions are
//!   rejected, not guessed at.
//! - **Header JSON**: serialized `StoreHeader` (store type, salt, KDF
//!   params).
//! - **Records**: one length-prefixed JSON record per alias, so the
//!   stream is self-delimiting with no terminator bytes.
//! - **HMAC-SHA256**: 32-byte tag over the header and record bytes,
//!   keyed by an HKDF sub-key of the password-derived master key.
//!   Flipping any byte of any record invalidates the whole tag.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::entry::Record;
use crate::crypto::Argon2Params;
use crate::errors::{KeyholdError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every keystore file.
const MAGIC: &[u8; 4] = b"KHLD";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// StoreHeader
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a keystore file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHeader {
    /// Format version.
    pub version: u8,

    /// Store type identifier chosen at creation (e.g. "keyhold").
    pub store_type: String,

    /// The salt for the store-level master key (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// When this keystore was first created.
    pub created_at: DateTime<Utc>,

    /// Argon2 params used at creation (stored so open uses the same).
    pub argon2_params: Argon2Params,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Write a keystore file to disk **atomically**.
///
/// 1. Serialize the header and each record to JSON.
/// 2. Compute the HMAC over header + record bytes.
/// 3. Write to a temp file in the same directory.
/// 4. Rename the temp file over the target path.
///
/// The rename ensures readers never see a half-written file.
pub fn write_store(
    path: &Path,
    header: &StoreHeader,
    records: &[Record],
    hmac_key: &[u8],
) -> Result<()> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| KeyholdError::SerializationError(format!("header: {e}")))?;
    let entries_bytes = encode_records(records)?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, &entries_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        KeyholdError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + entries_bytes.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&entries_bytes); // length-prefixed records
    buf.extend_from_slice(&hmac_tag); // 32 bytes

    // Atomic write: write to a temp file, then rename.  The temp file
    // lives in the same directory so the rename stays on one
    // filesystem and is atomic.
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Raw data read from a keystore file on disk.
///
/// Keeps the original bytes so the HMAC can be verified over the
/// exact bytes that were written, with no re-serialization round-trip.
pub struct RawStore {
    pub header: StoreHeader,
    pub records: Vec<Record>,
    /// The raw header JSON bytes exactly as stored on disk.
    pub header_bytes: Vec<u8>,
    /// The raw record-section bytes (count + length-prefixed records).
    pub entries_bytes: Vec<u8>,
    /// The HMAC tag stored at the end of the file.
    pub stored_hmac: Vec<u8>,
}

/// Read a keystore file from disk and return its parts **with raw bytes**.
///
/// The caller must verify the HMAC over `header_bytes` and
/// `entries_bytes` before trusting any deserialized record.  Parsing
/// is all-or-nothing: any structural defect fails the whole read.
pub fn read_store(path: &Path) -> Result<RawStore> {
    if !path.exists() {
        return Err(KeyholdError::StoreNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;

    // Minimum size: prefix + record count + HMAC.
    let min_size = PREFIX_LEN + 4 + HMAC_LEN;
    if data.len() < min_size {
        return Err(KeyholdError::MalformedStore(
            "file too small to be a valid keystore".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(KeyholdError::MalformedStore(
            "missing KHLD magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(KeyholdError::MalformedStore(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| KeyholdError::MalformedStore("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        KeyholdError::MalformedStore(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + 4 + HMAC_LEN > data.len() {
        return Err(KeyholdError::MalformedStore(
            "header length exceeds file size".into(),
        ));
    }

    // --- Extract the variable-length sections as raw bytes ---

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let entries_end = data.len() - HMAC_LEN;
    let entries_bytes = data[header_end..entries_end].to_vec();
    let stored_hmac = data[entries_end..].to_vec();

    // --- Deserialize from the raw bytes ---

    let header: StoreHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| KeyholdError::MalformedStore(format!("header JSON: {e}")))?;

    let records = decode_records(&entries_bytes)?;

    Ok(RawStore {
        header,
        records,
        header_bytes,
        entries_bytes,
        stored_hmac,
    })
}

// ---------------------------------------------------------------------------
// Record section encoding
// ---------------------------------------------------------------------------

/// Encode records as `[count][len][json]...` with u32 LE prefixes.
fn encode_records(records: &[Record]) -> Result<Vec<u8>> {
    let count = u32::try_from(records.len())
        .map_err(|_| KeyholdError::SerializationError("too many entries".into()))?;

    let mut buf = Vec::new();
    buf.extend_from_slice(&count.to_le_bytes());

    for record in records {
        let json = serde_json::to_vec(record).map_err(|e| {
            KeyholdError::SerializationError(format!("entry '{}': {e}", record.alias))
        })?;
        let len = u32::try_from(json.len()).map_err(|_| {
            KeyholdError::SerializationError(format!("entry '{}' exceeds u32::MAX", record.alias))
        })?;
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&json);
    }

    Ok(buf)
}

/// Parse the record section produced by `encode_records`.
///
/// Every length prefix must land inside the buffer and the declared
/// count must consume it exactly; trailing garbage is an error.
fn decode_records(bytes: &[u8]) -> Result<Vec<Record>> {
    if bytes.len() < 4 {
        return Err(KeyholdError::MalformedStore(
            "record section too small".into(),
        ));
    }

    let count = u32::from_le_bytes(
        bytes[0..4]
            .try_into()
            .map_err(|_| KeyholdError::MalformedStore("bad record count".into()))?,
    );

    let mut records = Vec::with_capacity(count.min(1024) as usize);
    let mut pos = 4usize;

    for i in 0..count {
        if pos + 4 > bytes.len() {
            return Err(KeyholdError::MalformedStore(format!(
                "record {i} length prefix runs past end of file"
            )));
        }
        let len = u32::from_le_bytes(
            bytes[pos..pos + 4]
                .try_into()
                .map_err(|_| KeyholdError::MalformedStore(format!("record {i}: bad length")))?,
        ) as usize;
        pos += 4;

        if pos + len > bytes.len() {
            return Err(KeyholdError::MalformedStore(format!(
                "record {i} body runs past end of file"
            )));
        }
        let record: Record = serde_json::from_slice(&bytes[pos..pos + len])
            .map_err(|e| KeyholdError::MalformedStore(format!("record {i} JSON: {e}")))?;
        records.push(record);
        pos += len;
    }

    if pos != bytes.len() {
        return Err(KeyholdError::MalformedStore(
            "trailing bytes after last record".into(),
        ));
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Integrity digest
// ---------------------------------------------------------------------------

/// Compute HMAC-SHA256 over header + record bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], entries_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyholdError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(entries_bytes);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify that the HMAC matches using constant-time comparison.
///
/// Uses `hmac::Mac::verify_slice` which is guaranteed constant-time,
/// preventing timing side-channel attacks.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    entries_bytes: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyholdError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(entries_bytes);

    mac.verify_slice(expected_hmac)
        .map_err(|_| KeyholdError::IntegrityMismatch)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
