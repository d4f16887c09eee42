//! Error types for the warehouse-bridge library.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for configuration and malformed-input errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the installation key has not been initialized.
pub const EXIT_NOT_INITIALIZED: u8 = 2;
/// Exit code for failed decryption integrity checks.
pub const EXIT_AUTHENTICATION: u8 = 3;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for mapping, synthesis and encryption operations.
///
/// Messages never include key material or decrypted secrets.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No key file could be resolved; the installation was never initialized.
    #[error("Encryption key not found at {path:?}. Run `warehouse-bridge init` first.")]
    ConfigurationMissing { path: PathBuf },

    /// A key file already exists and would be overwritten.
    #[error("Encryption key already exists at {path:?}. Use --force to replace it; previously encrypted payloads will become unreadable.")]
    KeyAlreadyInitialized { path: PathBuf },

    /// The integrity tag did not verify: wrong key or tampered payload.
    #[error("Authentication failed: encrypted payload does not verify under the installation key (wrong key or corrupted data)")]
    Authentication,

    /// Mapping artifact is structurally invalid.
    #[error("Malformed mapping artifact: {0}")]
    MalformedArtifact(String),

    /// Encrypted payload fields cannot be decoded.
    #[error("Malformed encrypted payload: {0}")]
    MalformedPayload(String),

    /// Key material is unusable.
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// The operating system random source failed.
    #[error("Secure random number generation failed")]
    RandomSource,

    /// Tool configuration error (invalid YAML values, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential vault or saved connection store error.
    #[error("Vault error: {0}")]
    Vault(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Create a MalformedArtifact error.
    pub fn malformed(message: impl Into<String>) -> Self {
        BridgeError::MalformedArtifact(message.into())
    }

    /// Create a MalformedPayload error.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        BridgeError::MalformedPayload(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BridgeError::ConfigurationMissing { .. } => EXIT_NOT_INITIALIZED,
            BridgeError::Authentication => EXIT_AUTHENTICATION,
            BridgeError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_CONFIG_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for warehouse-bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = BridgeError::ConfigurationMissing {
            path: PathBuf::from("/tmp/key"),
        };
        assert_eq!(missing.exit_code(), EXIT_NOT_INITIALIZED);
        assert_eq!(BridgeError::Authentication.exit_code(), EXIT_AUTHENTICATION);
        assert_eq!(BridgeError::malformed("x").exit_code(), EXIT_CONFIG_ERROR);

        let io = BridgeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let err = BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let text = err.format_detailed();
        assert!(text.starts_with("Error: IO error: denied"));
    }

    #[test]
    fn test_missing_key_message_directs_to_init() {
        let err = BridgeError::ConfigurationMissing {
            path: PathBuf::from("key"),
        };
        assert!(err.to_string().contains("warehouse-bridge init"));
    }
}
