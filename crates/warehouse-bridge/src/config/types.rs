//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::{ExportFormat, ExportOptions};

/// Directory name under the user configuration directory.
pub const APP_DIR_NAME: &str = "warehouse-bridge";

/// Fallback directory when the platform has no user configuration directory.
pub const FALLBACK_DIR: &str = ".warehouse-bridge";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Installation key file (default: `<config dir>/warehouse-bridge/key`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// Credential vault file (default: `vault.json` next to the key file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_file: Option<PathBuf>,

    /// Saved connections file (default: `connections.json` next to the key file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections_file: Option<PathBuf>,

    /// Defaults for new mappings' export options.
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Directory holding the installation files.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR))
    }

    /// Resolved key file path.
    pub fn key_file(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| Self::default_dir().join("key"))
    }

    /// Resolved vault file path.
    pub fn vault_file(&self) -> PathBuf {
        self.vault_file
            .clone()
            .unwrap_or_else(|| self.sibling_of_key("vault.json"))
    }

    /// Resolved saved connections file path.
    pub fn connections_file(&self) -> PathBuf {
        self.connections_file
            .clone()
            .unwrap_or_else(|| self.sibling_of_key("connections.json"))
    }

    fn sibling_of_key(&self, name: &str) -> PathBuf {
        let key = self.key_file();
        match key.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output file format (default: parquet).
    #[serde(default)]
    pub format: ExportFormat,

    /// Output directory (default: ./export).
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl ExportConfig {
    /// Export options for a new mapping.
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions {
            format: self.format,
            output_dir: self.output_dir.clone(),
        }
    }
}

fn default_output_dir() -> String {
    "./export".to_string()
}
