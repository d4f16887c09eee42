//! Secret input for passphrases and database passwords.
//!
//! Secrets come from an environment variable when set, otherwise from an
//! interactive prompt. Non-interactive runs without the variable fail
//! instead of blocking on stdin.

use std::io::IsTerminal;

use dialoguer::{Confirm, Password};
use warehouse_bridge::{BridgeError, Result};
use zeroize::Zeroizing;

/// Environment variable holding the key passphrase for `init --passphrase`.
pub const PASSPHRASE_ENV: &str = "WAREHOUSE_BRIDGE_PASSPHRASE";

/// Environment variable holding a database password or vault secret.
pub const PASSWORD_ENV: &str = "WAREHOUSE_BRIDGE_PASSWORD";

fn prompt_error(e: dialoguer::Error) -> BridgeError {
    BridgeError::Io(std::io::Error::other(e.to_string()))
}

/// Read a secret from `env_var`, or prompt for it on a terminal.
///
/// With `confirm`, the prompt asks twice and requires both entries to match.
pub fn read_secret(env_var: &str, prompt: &str, confirm: bool) -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok(Zeroizing::new(value));
    }

    if !std::io::stdin().is_terminal() {
        return Err(BridgeError::Config(format!(
            "{} is not set and no terminal is available to prompt for it",
            env_var
        )));
    }

    let mut input = Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Repeat to confirm", "Entries do not match");
    }
    let secret: String = input.interact().map_err(prompt_error)?;
    Ok(Zeroizing::new(secret))
}

/// Ask for confirmation on a terminal. Non-interactive runs answer no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(prompt_error)
}
