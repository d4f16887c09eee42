//! Saved source connections with encrypted passwords.
//!
//! ```text
//! { "version": 1, "connections": [ { name, engine, host, port, database, user, password, ssl } ] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use super::{check_entry_name, check_version, STORE_VERSION};
use crate::artifact::{ConnectionDescriptor, ConnectionParams};
use crate::core::schema::SourceEngine;
use crate::crypto::EncryptionService;
use crate::error::{BridgeError, Result};
use crate::persist;

/// A named source connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConnection {
    pub name: String,
    pub engine: SourceEngine,
    #[serde(flatten)]
    pub connection: ConnectionDescriptor,
}

impl SavedConnection {
    /// Build a saved connection, encrypting `password`.
    pub fn new(
        name: impl Into<String>,
        engine: SourceEngine,
        params: ConnectionParams,
        password: &str,
        service: &EncryptionService,
    ) -> Result<Self> {
        let name = name.into();
        check_entry_name("connection", &name)?;
        Ok(Self {
            name,
            engine,
            connection: ConnectionDescriptor::seal(params, password, service)?,
        })
    }

    /// Plaintext connection parameters.
    pub fn params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.connection.host.clone(),
            port: self.connection.port,
            database: self.connection.database.clone(),
            user: self.connection.user.clone(),
            ssl: self.connection.ssl,
        }
    }

    pub fn decrypt_password(&self, service: &EncryptionService) -> Result<Zeroizing<String>> {
        self.connection.decrypt_password(service)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConnectionsFile {
    version: u32,
    #[serde(default)]
    connections: Vec<SavedConnection>,
}

/// Saved connections backed by a JSON file.
#[derive(Debug)]
pub struct ConnectionStore {
    path: PathBuf,
    file: ConnectionsFile,
}

impl ConnectionStore {
    /// Open the store. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            let file: ConnectionsFile = serde_json::from_str(&content).map_err(|e| {
                BridgeError::Vault(format!("{:?} is not a valid connections file: {}", path, e))
            })?;
            check_version(&path, file.version)?;
            file
        } else {
            ConnectionsFile {
                version: STORE_VERSION,
                connections: Vec::new(),
            }
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a connection, replacing one with the same name in place.
    /// Returns whether an existing entry was replaced.
    pub fn upsert(&mut self, connection: SavedConnection) -> bool {
        match self
            .file
            .connections
            .iter_mut()
            .find(|c| c.name == connection.name)
        {
            Some(existing) => {
                *existing = connection;
                true
            }
            None => {
                self.file.connections.push(connection);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SavedConnection> {
        self.file.connections.iter().find(|c| c.name == name)
    }

    /// Remove a connection. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.file.connections.len();
        self.file.connections.retain(|c| c.name != name);
        self.file.connections.len() != before
    }

    pub fn list(&self) -> &[SavedConnection] {
        &self.file.connections
    }

    /// Write the store (atomic, owner-only permissions).
    pub fn save(&self) -> Result<()> {
        let mut content = serde_json::to_string_pretty(&self.file)?;
        content.push('\n');
        persist::write_private(&self.path, content.as_bytes())?;
        info!(
            "Saved {} connections to {:?}",
            self.file.connections.len(),
            self.path
        );
        Ok(())
    }
}
