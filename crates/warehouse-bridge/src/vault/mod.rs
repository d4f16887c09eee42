//! Credential vault: named secrets encrypted under the installation key.
//!
//! ```text
//! { "version": 1, "credentials": { "<name>": <EncryptedPayload>, ... } }
//! ```
//!
//! Entries are kept ordered by name so the file diffs cleanly.

pub mod connections;

pub use connections::{ConnectionStore, SavedConnection};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::{EncryptedPayload, EncryptionService};
use crate::error::{BridgeError, Result};
use crate::persist;

/// Vault and saved-connection file format version.
pub const STORE_VERSION: u32 = 1;

pub(crate) fn check_entry_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::Vault(format!("{} name cannot be empty", kind)));
    }
    Ok(())
}

pub(crate) fn check_version(path: &Path, version: u32) -> Result<()> {
    if version != STORE_VERSION {
        return Err(BridgeError::Vault(format!(
            "{:?} has unsupported version {} (expected {})",
            path, version, STORE_VERSION
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    #[serde(default)]
    credentials: BTreeMap<String, EncryptedPayload>,
}

/// Credential vault backed by a JSON file.
#[derive(Debug)]
pub struct CredentialVault {
    path: PathBuf,
    file: VaultFile,
}

impl CredentialVault {
    /// Open the vault. A missing file is an empty vault.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            let file: VaultFile = serde_json::from_str(&content)
                .map_err(|e| BridgeError::Vault(format!("{:?} is not a valid vault: {}", path, e)))?;
            check_version(&path, file.version)?;
            file
        } else {
            VaultFile {
                version: STORE_VERSION,
                credentials: BTreeMap::new(),
            }
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt and store a secret, replacing any previous value.
    pub fn set(&mut self, name: &str, secret: &str, service: &EncryptionService) -> Result<()> {
        check_entry_name("credential", name)?;
        let payload = service.encrypt(secret)?;
        self.file.credentials.insert(name.to_string(), payload);
        Ok(())
    }

    /// Decrypt a stored secret.
    pub fn get(&self, name: &str, service: &EncryptionService) -> Result<Zeroizing<String>> {
        let payload = self
            .file
            .credentials
            .get(name)
            .ok_or_else(|| BridgeError::Vault(format!("no credential named '{}'", name)))?;
        service.decrypt(payload)
    }

    /// Remove a secret. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.file.credentials.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.file.credentials.contains_key(name)
    }

    /// Credential names in order.
    pub fn names(&self) -> Vec<&str> {
        self.file.credentials.keys().map(String::as_str).collect()
    }

    /// Write the vault (atomic, owner-only permissions).
    pub fn save(&self) -> Result<()> {
        let mut content = serde_json::to_string_pretty(&self.file)?;
        content.push('\n');
        persist::write_private(&self.path, content.as_bytes())?;
        info!(
            "Saved {} credentials to {:?}",
            self.file.credentials.len(),
            self.path
        );
        Ok(())
    }
}
