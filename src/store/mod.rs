//! Keystore module — encrypted credential storage.
//!
//! This module provides:
//! - `Certificate`, `Entry`, and `Record` types (`entry`)
//! - Binary keystore file format with HMAC integrity (`format`)
//! - High-level `KeyStore` for creating, opening, and managing stores
//!   (`engine`)

pub mod engine;
pub mod entry;
pub mod format;

// Re-export the most commonly used items.
pub use engine::{KeyStore, PlainEntry};
pub use entry::{Certificate, Entry, Record, RecordMetadata};
pub use format::{StoreHeader, CURRENT_VERSION};
