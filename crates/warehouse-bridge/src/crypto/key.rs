//! Installation encryption key.

use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{BridgeError, Result};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count for passphrase-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Fixed application salt for passphrase-derived keys.
///
/// A constant salt lets the same passphrase re-derive the same key on any
/// machine without storing the salt. The cost is that two installations
/// sharing a passphrase share a key.
pub const KEY_DERIVATION_SALT: &[u8] = b"warehouse-bridge/key-derivation/v1";

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct KeyBytes([u8; KEY_LEN]);

/// A 256-bit key with automatic zeroization.
///
/// The key bytes never appear in `Debug` output; use
/// [`fingerprint`](Self::fingerprint) to identify a key in logs.
pub struct EncryptionKey {
    bytes: KeyBytes,
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("fingerprint", &self.fingerprint())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: KeyBytes(bytes),
        }
    }

    /// Generate 256 random bits from the operating system.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| BridgeError::RandomSource)?;
        let key = Self::new(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Derive a key from a passphrase with PBKDF2-HMAC-SHA256.
    ///
    /// Deterministic: the same passphrase always yields the same key.
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(BridgeError::InvalidKey(
                "passphrase cannot be empty".to_string(),
            ));
        }
        let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
            .ok_or_else(|| BridgeError::InvalidKey("iteration count must be non-zero".into()))?;

        let mut bytes = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            KEY_DERIVATION_SALT,
            passphrase.as_bytes(),
            &mut bytes,
        );
        let key = Self::new(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Parse a hex-encoded key (64 hex characters, surrounding whitespace ignored).
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            hex::decode(encoded.trim())
                .map_err(|_| BridgeError::InvalidKey("key is not valid hex".to_string()))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(BridgeError::InvalidKey(format!(
                "key must be exactly {} bytes, found {}",
                KEY_LEN,
                decoded.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        let key = Self::new(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Hex encoding of the key, for the key file only.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes.0))
    }

    /// Short SHA-256 fingerprint (16 hex characters) that identifies the key
    /// without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.0);
        hex::encode(&digest[..8])
    }

    pub(crate) fn expose_secret(&self) -> &[u8; KEY_LEN] {
        &self.bytes.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = EncryptionKey::generate().unwrap();
        let b = EncryptionKey::generate().unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_passphrase_derivation_is_deterministic() {
        let a = EncryptionKey::from_passphrase("correct horse").unwrap();
        let b = EncryptionKey::from_passphrase("correct horse").unwrap();
        let c = EncryptionKey::from_passphrase("battery staple").unwrap();
        assert_eq!(a.expose_secret(), b.expose_secret());
        assert_ne!(a.expose_secret(), c.expose_secret());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let err = EncryptionKey::from_passphrase("").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidKey(_)));
    }

    #[test]
    fn test_hex_round_trip() {
        let key = EncryptionKey::new([0x42; KEY_LEN]);
        let encoded = key.to_hex();
        assert_eq!(encoded.len(), 64);
        let parsed = EncryptionKey::from_hex(&format!("{}\n", encoded.as_str())).unwrap();
        assert_eq!(parsed.expose_secret(), &[0x42; KEY_LEN]);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(
            EncryptionKey::from_hex("not hex").unwrap_err(),
            BridgeError::InvalidKey(_)
        ));
        assert!(matches!(
            EncryptionKey::from_hex("abcd").unwrap_err(),
            BridgeError::InvalidKey(_)
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EncryptionKey::new([0xAB; KEY_LEN]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(key.to_hex().as_str()));
    }

    #[test]
    fn test_fingerprint_shape() {
        let key = EncryptionKey::new([0u8; KEY_LEN]);
        let fp = key.fingerprint();
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, key.fingerprint());
        assert_ne!(fp, EncryptionKey::new([1u8; KEY_LEN]).fingerprint());
    }
}
