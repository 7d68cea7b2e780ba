//! `keyhold create` — create a new empty keystore file.

use std::fs;
use std::path::Path;

use crate::cli::{output, resolve_new_password};
use crate::errors::Result;
use crate::store::KeyStore;

/// Execute the `create` command.
///
/// Initializes an empty store, saves it, and reports the resolved
/// absolute path of the new file.
pub fn execute(path: &str, store_type: &str, password: Option<&str>, force: bool) -> Result<()> {
    let path = Path::new(path);

    // Create the parent directory if the caller gave a nested path.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            output::info(&format!("Created directory: {}", parent.display()));
        }
    }

    let password = resolve_new_password(password)?;

    let mut store = KeyStore::create(path, store_type, password.as_bytes(), None, force)?;
    store.save()?;

    let absolute = fs::canonicalize(path)?;
    output::success(&format!(
        "Keystore of type '{}' created at {}",
        store.store_type(),
        absolute.display()
    ));

    Ok(())
}
