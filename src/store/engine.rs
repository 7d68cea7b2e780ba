//! High-level keystore operations.
//!
//! `KeyStore` wraps the binary format layer and the crypto layer so
//! callers can work with simple alias-keyed method calls like
//! `store.set_secret_entry("api-key", ...)`.
//!
//! The lifecycle is carried by the type itself: a store that was never
//! created or opened does not exist as a value, and `destroy` consumes
//! the value so a destroyed store cannot be touched again.  Mutations
//! act only on the in-memory table; nothing reaches disk until an
//! explicit `save`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::kdf::{derive_key, generate_salt, Argon2Params};
use crate::crypto::keys::MasterKey;
use crate::crypto::protect::{protect, unprotect};
use crate::errors::{KeyholdError, Result};

use super::entry::{Certificate, Entry, Record, RecordMetadata};
use super::format::{self, StoreHeader, CURRENT_VERSION};

/// Longest alias accepted.
const MAX_ALIAS_LEN: usize = 256;

/// An entry with its protected payloads opened.
///
/// Returned by `KeyStore::get_entry`.  Plaintext fields are wrapped in
/// `Zeroizing` so they are wiped when the caller drops them; the
/// engine itself never caches them.
pub enum PlainEntry {
    /// The secret-key bytes.
    Secret { plaintext: Zeroizing<Vec<u8>> },

    /// The private-key bytes plus the stored chain, leaf first.
    PrivateKey {
        key: Zeroizing<Vec<u8>>,
        chain: Vec<Certificate>,
    },

    /// The trusted certificate (nothing to unprotect).
    TrustedCert { certificate: Certificate },
}

/// The main keystore handle.  Create one with `KeyStore::create` or
/// `KeyStore::open`, then use its methods to manage entries.
pub struct KeyStore {
    /// Path to the keystore file on disk.
    path: PathBuf,

    /// Header metadata (version, store type, salt, KDF params).
    header: StoreHeader,

    /// In-memory map of alias -> record.
    records: HashMap<String, Record>,

    /// The derived master key (zeroized on drop); keys the integrity
    /// digest at save time.
    master_key: MasterKey,
}

impl KeyStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Initialize a brand-new, empty keystore bound to `path`.
    ///
    /// Generates a random salt and derives the master key from the
    /// password.  Nothing is written to disk: the new store exists
    /// only in memory until `save` is called.
    ///
    /// Pass `None` for `argon2_params` to use sensible defaults.
    /// Refuses to shadow an existing file unless `overwrite` is set.
    pub fn create(
        path: &Path,
        store_type: &str,
        password: &[u8],
        argon2_params: Option<&Argon2Params>,
        overwrite: bool,
    ) -> Result<Self> {
        if path.exists() && !overwrite {
            return Err(KeyholdError::StoreAlreadyExists(path.to_path_buf()));
        }

        let salt = generate_salt();
        let effective_params = argon2_params.copied().unwrap_or_default();

        let mut master_bytes = derive_key(password, &salt, &effective_params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        let header = StoreHeader {
            version: CURRENT_VERSION,
            store_type: store_type.to_string(),
            salt: salt.to_vec(),
            created_at: Utc::now(),
            argon2_params: effective_params,
        };

        Ok(Self {
            path: path.to_path_buf(),
            header,
            records: HashMap::new(),
            master_key,
        })
    }

    /// Open an existing keystore file, verifying its integrity.
    ///
    /// Reads the binary file, derives the master key from the password
    /// and the stored salt (with the stored Argon2 params), and
    /// verifies the HMAC **over the original bytes from disk**.  No
    /// record is exposed unless the whole file checks out.
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let raw = format::read_store(path)?;

        let mut master_bytes = derive_key(password, &raw.header.salt, &raw.header.argon2_params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        // Verify the HMAC over the *original raw bytes* from disk.
        // This avoids the re-serialization round-trip bug where
        // serde_json might produce different byte output.
        let mut hmac_key = master_key.derive_integrity_key()?;
        let verified = format::verify_hmac(
            &hmac_key,
            &raw.header_bytes,
            &raw.entries_bytes,
            &raw.stored_hmac,
        );
        hmac_key.zeroize();
        verified?;

        let records: HashMap<String, Record> = raw
            .records
            .into_iter()
            .map(|r| (r.alias.clone(), r))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            header: raw.header,
            records,
            master_key,
        })
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add or overwrite a secret-key entry.
    ///
    /// The plaintext is protected with `entry_password` (its own salt,
    /// KDF run, and nonce) before it touches the table.
    pub fn set_secret_entry(
        &mut self,
        alias: &str,
        plaintext: &[u8],
        entry_password: &[u8],
    ) -> Result<()> {
        Self::validate_alias(alias)?;

        let protected = protect(entry_password, plaintext, &self.header.argon2_params)?;
        let entry = Entry::secret(protected)?;
        self.insert(alias, entry);
        Ok(())
    }

    /// Add or overwrite a private-key entry with its certificate
    /// chain (ordered leaf first, never empty).
    ///
    /// Fails with `EmptyChain` before anything is protected or
    /// inserted when the chain is empty.
    pub fn set_key_entry(
        &mut self,
        alias: &str,
        private_key: &[u8],
        key_password: &[u8],
        chain: &[Certificate],
    ) -> Result<()> {
        Self::validate_alias(alias)?;
        if chain.is_empty() {
            return Err(KeyholdError::EmptyChain(alias.to_string()));
        }

        let protected_key = protect(key_password, private_key, &self.header.argon2_params)?;
        let entry = Entry::private_key(alias, protected_key, chain.to_vec())?;
        self.insert(alias, entry);
        Ok(())
    }

    /// Add or overwrite a trusted-certificate entry.
    pub fn set_certificate_entry(&mut self, alias: &str, certificate: Certificate) -> Result<()> {
        Self::validate_alias(alias)?;
        self.insert(alias, Entry::trusted_cert(certificate));
        Ok(())
    }

    /// Unprotect and return the entry stored under `alias`.
    ///
    /// `entry_password` must be the password the entry was set with.
    /// Trusted-certificate entries carry no protected material, so the
    /// password is not consulted for them.
    pub fn get_entry(&self, alias: &str, entry_password: &[u8]) -> Result<PlainEntry> {
        let record = self.record(alias)?;

        match &record.entry {
            Entry::Secret { protected } => {
                let plaintext = unprotect(entry_password, protected)?;
                Ok(PlainEntry::Secret { plaintext })
            }
            Entry::PrivateKey {
                protected_key,
                chain,
            } => {
                let key = unprotect(entry_password, protected_key)?;
                Ok(PlainEntry::PrivateKey {
                    key,
                    chain: chain.clone(),
                })
            }
            Entry::TrustedCert { certificate } => Ok(PlainEntry::TrustedCert {
                certificate: certificate.clone(),
            }),
        }
    }

    /// Return the certificate stored under `alias` without touching
    /// any protected material.
    ///
    /// A trusted-certificate entry yields its certificate; a
    /// private-key entry yields the leaf of its chain; a secret entry
    /// holds no certificate and fails with `WrongEntryType`.
    pub fn get_certificate(&self, alias: &str) -> Result<&Certificate> {
        let record = self.record(alias)?;

        match &record.entry {
            Entry::TrustedCert { certificate } => Ok(certificate),
            // Chain is validated non-empty at construction, but avoid
            // panicking on a hand-edited store.
            Entry::PrivateKey { chain, .. } => {
                chain.first().ok_or_else(|| KeyholdError::WrongEntryType {
                    alias: alias.to_string(),
                    found: "private-key",
                })
            }
            Entry::Secret { .. } => Err(KeyholdError::WrongEntryType {
                alias: alias.to_string(),
                found: record.entry.kind(),
            }),
        }
    }

    /// Remove the entry stored under `alias` from the in-memory table.
    pub fn delete_entry(&mut self, alias: &str) -> Result<()> {
        if self.records.remove(alias).is_none() {
            return Err(KeyholdError::EntryNotFound(alias.to_string()));
        }
        Ok(())
    }

    /// List metadata for all entries, sorted by alias.
    pub fn list_entries(&self) -> Vec<RecordMetadata> {
        let mut list: Vec<RecordMetadata> = self
            .records
            .values()
            .map(|r| RecordMetadata {
                alias: r.alias.clone(),
                kind: r.entry.kind(),
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect();

        list.sort_by(|a, b| a.alias.cmp(&b.alias));
        list
    }

    /// All aliases in the store, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.records.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialize the keystore and write it to disk atomically.
    ///
    /// Computes a fresh HMAC over the header + record bytes and writes
    /// the full binary envelope via temp-file + rename.
    pub fn save(&mut self) -> Result<()> {
        // Collect records into a sorted Vec for deterministic output.
        let mut record_list: Vec<Record> = self.records.values().cloned().collect();
        record_list.sort_by(|a, b| a.alias.cmp(&b.alias));

        let mut hmac_key = self.master_key.derive_integrity_key()?;
        let written = format::write_store(&self.path, &self.header, &record_list, &hmac_key);
        hmac_key.zeroize();

        written
    }

    /// Destroy the keystore: delete the backing file, then drop the
    /// in-memory table and master key.
    ///
    /// The file is removed before anything in memory is released, so
    /// on-disk state is all-or-nothing: either the file is gone or it
    /// is untouched (in which case `open` still works).  A file that
    /// is already gone is not an error.
    pub fn destroy(self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(KeyholdError::Io(e)),
        }
        // `self` drops here: the record table is freed and the master
        // key zeroizes itself.
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the keystore file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the store type identifier (e.g. "keyhold").
    pub fn store_type(&self) -> &str {
        &self.header.store_type
    }

    /// Returns the number of entries in the store.
    pub fn entry_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the keystore creation timestamp.
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.header.created_at
    }

    /// Returns `true` if the store holds an entry under `alias`.
    ///
    /// This is a metadata-only check, nothing is unprotected.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.records.contains_key(alias)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&self, alias: &str) -> Result<&Record> {
        self.records
            .get(alias)
            .ok_or_else(|| KeyholdError::EntryNotFound(alias.to_string()))
    }

    /// Insert or overwrite, preserving the original `created_at` when
    /// an alias is overwritten.
    fn insert(&mut self, alias: &str, entry: Entry) {
        let now = Utc::now();
        let created_at = self
            .records
            .get(alias)
            .map_or(now, |existing| existing.created_at);

        self.records.insert(
            alias.to_string(),
            Record {
                alias: alias.to_string(),
                entry,
                created_at,
                updated_at: now,
            },
        );
    }

    /// Validate that an alias is usable as a table key.
    ///
    /// Aliases are case-sensitive, must be non-empty, and are capped
    /// at 256 characters.
    fn validate_alias(alias: &str) -> Result<()> {
        if alias.is_empty() {
            return Err(KeyholdError::InvalidAlias("alias cannot be empty".into()));
        }
        if alias.len() > MAX_ALIAS_LEN {
            return Err(KeyholdError::InvalidAlias(format!(
                "alias cannot exceed {MAX_ALIAS_LEN} characters"
            )));
        }
        Ok(())
    }
}
