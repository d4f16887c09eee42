//! Installation key file lifecycle.
//!
//! The key file holds one line: the hex-encoded 256-bit key. Its presence is
//! what marks the installation as initialized. Replacing the key makes every
//! payload encrypted under the old key unreadable; there is no rotation.

use std::path::{Path, PathBuf};

use tracing::info;

use super::cipher::EncryptionService;
use super::key::EncryptionKey;
use crate::error::{BridgeError, Result};
use crate::persist;

/// Location of the installation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a key file exists.
    pub fn is_initialized(&self) -> bool {
        self.path.is_file()
    }

    /// Initialize with 256 random bits.
    pub fn init_generated(&self, force: bool) -> Result<EncryptionKey> {
        self.guard_existing(force)?;
        let key = EncryptionKey::generate()?;
        self.write(&key)?;
        info!(
            "Initialized random encryption key {} at {:?}",
            key.fingerprint(),
            self.path
        );
        Ok(key)
    }

    /// Initialize with a key derived from `passphrase`.
    pub fn init_from_passphrase(&self, passphrase: &str, force: bool) -> Result<EncryptionKey> {
        self.guard_existing(force)?;
        let key = EncryptionKey::from_passphrase(passphrase)?;
        self.write(&key)?;
        info!(
            "Initialized passphrase-derived encryption key {} at {:?}",
            key.fingerprint(),
            self.path
        );
        Ok(key)
    }

    /// Load the installation key.
    ///
    /// Fails with [`BridgeError::ConfigurationMissing`] when no key file
    /// exists.
    pub fn load(&self) -> Result<EncryptionKey> {
        if !self.is_initialized() {
            return Err(BridgeError::ConfigurationMissing {
                path: self.path.clone(),
            });
        }
        let content = zeroize::Zeroizing::new(std::fs::read_to_string(&self.path)?);
        EncryptionKey::from_hex(&content)
    }

    /// Load the key and wrap it in an encryption service.
    pub fn service(&self) -> Result<EncryptionService> {
        Ok(EncryptionService::new(self.load()?))
    }

    /// Remove the key file. Returns whether a file was removed.
    pub fn teardown(&self) -> Result<bool> {
        if !self.is_initialized() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        info!("Removed encryption key at {:?}", self.path);
        Ok(true)
    }

    fn guard_existing(&self, force: bool) -> Result<()> {
        if self.is_initialized() && !force {
            return Err(BridgeError::KeyAlreadyInitialized {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn write(&self, key: &EncryptionKey) -> Result<()> {
        let mut line = key.to_hex();
        line.push('\n');
        persist::write_private(&self.path, line.as_bytes())
    }
}
