//! CLI module — Clap argument parser, output helpers, and command
//! implementations.

pub mod commands;
pub mod output;

use clap::Parser;
use zeroize::Zeroizing;

use crate::errors::{KeyholdError, Result};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Keyhold CLI: password-protected keystore for keys and certificates.
#[derive(Parser)]
#[command(
    name = "keyhold",
    about = "Password-protected keystore for keys and certificates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new empty keystore file
    Create {
        /// Path of the keystore file to create
        path: String,

        /// Store type identifier written into the file header
        #[arg(long, default_value = "keyhold")]
        store_type: String,

        /// Store password (omit for interactive prompt)
        #[arg(long, env = "KEYHOLD_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Overwrite an existing keystore at the same path
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve the store password for `create`.
///
/// An explicitly supplied password (flag or `KEYHOLD_PASSWORD`) is
/// taken as-is; otherwise prompt interactively with confirmation and
/// enforce a minimum length.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on
/// drop.
pub fn resolve_new_password(supplied: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(pw) = supplied {
        if pw.is_empty() {
            return Err(KeyholdError::CommandFailed(
                "password cannot be empty".into(),
            ));
        }
        return Ok(Zeroizing::new(pw.to_string()));
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose keystore password")
            .with_confirmation(
                "Confirm keystore password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| KeyholdError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}
