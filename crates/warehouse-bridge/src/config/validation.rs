//! Configuration validation.

use super::Config;
use crate::error::{BridgeError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for (field, value) in [
        ("key_file", &config.key_file),
        ("vault_file", &config.vault_file),
        ("connections_file", &config.connections_file),
    ] {
        if let Some(path) = value {
            if path.as_os_str().is_empty() {
                return Err(BridgeError::Config(format!("{} cannot be empty", field)));
            }
        }
    }

    if config.export.output_dir.trim().is_empty() {
        return Err(BridgeError::Config(
            "export.output_dir cannot be empty".into(),
        ));
    }

    if let (Some(key), Some(vault)) = (&config.key_file, &config.vault_file) {
        if key == vault {
            return Err(BridgeError::Config(
                "vault_file must differ from key_file".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_paths_rejected() {
        let config = Config {
            key_file: Some(PathBuf::new()),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("key_file"));
    }

    #[test]
    fn test_empty_output_dir_rejected() {
        let mut config = Config::default();
        config.export.output_dir = "  ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_vault_cannot_share_key_file() {
        let config = Config {
            key_file: Some(PathBuf::from("/etc/wb/key")),
            vault_file: Some(PathBuf::from("/etc/wb/key")),
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }
}
