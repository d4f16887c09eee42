//! Authenticated encryption of short secrets.
//!
//! ## Payload Layout
//!
//! ```text
//! {
//!   "encrypted": true,
//!   "algorithm": "aes-256-gcm",
//!   "iv": "<24 hex chars>",          12-byte random nonce
//!   "tag": "<32 hex chars>",         16-byte GCM tag
//!   "ciphertext": "<hex>"            same length as the plaintext
//! }
//! ```
//!
//! The algorithm tag is bound as associated data, so relabelling a payload
//! fails authentication. Nonces are drawn from the OS random source inside
//! [`encrypt`]; no API accepts a caller-supplied nonce.

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::key::EncryptionKey;
use crate::error::{BridgeError, Result};

/// Algorithm tag stored in every payload.
pub const ALGORITHM: &str = "aes-256-gcm";

/// Nonce (IV) length in bytes.
pub const NONCE_LEN: usize = aead::NONCE_LEN;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// At-rest form of an encrypted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub encrypted: bool,
    pub algorithm: String,
    pub iv: String,
    pub tag: String,
    pub ciphertext: String,
}

impl EncryptedPayload {
    /// Check the payload fields without decrypting.
    pub fn check_shape(&self) -> Result<()> {
        self.decode().map(|_| ())
    }

    fn decode(&self) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
        if !self.encrypted {
            return Err(BridgeError::malformed_payload("payload is not marked encrypted"));
        }
        if self.algorithm != ALGORITHM {
            return Err(BridgeError::malformed_payload(format!(
                "unsupported algorithm '{}'",
                self.algorithm
            )));
        }

        let iv = hex::decode(&self.iv)
            .map_err(|_| BridgeError::malformed_payload("iv is not valid hex"))?;
        let nonce: [u8; NONCE_LEN] = iv.as_slice().try_into().map_err(|_| {
            BridgeError::malformed_payload(format!(
                "iv must be {} bytes, found {}",
                NONCE_LEN,
                iv.len()
            ))
        })?;

        let tag = hex::decode(&self.tag)
            .map_err(|_| BridgeError::malformed_payload("tag is not valid hex"))?;
        if tag.len() != TAG_LEN {
            return Err(BridgeError::malformed_payload(format!(
                "tag must be {} bytes, found {}",
                TAG_LEN,
                tag.len()
            )));
        }

        let mut sealed = hex::decode(&self.ciphertext)
            .map_err(|_| BridgeError::malformed_payload("ciphertext is not valid hex"))?;
        sealed.extend_from_slice(&tag);

        Ok((nonce, sealed))
    }
}

fn aead_key(key: &EncryptionKey) -> Result<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.expose_secret())
        .map_err(|_| BridgeError::InvalidKey("key rejected by AES-256-GCM".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt a secret under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<EncryptedPayload> {
    encrypt_with(&SystemRandom::new(), plaintext, key)
}

fn encrypt_with<R: SecureRandom>(
    rng: &R,
    plaintext: &str,
    key: &EncryptionKey,
) -> Result<EncryptedPayload> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| BridgeError::RandomSource)?;

    let sealing_key = aead_key(key)?;
    let mut in_out = Zeroizing::new(plaintext.as_bytes().to_vec());
    let tag = sealing_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(ALGORITHM.as_bytes()),
            in_out.as_mut_slice(),
        )
        .map_err(|_| BridgeError::InvalidKey("encryption failed".to_string()))?;

    Ok(EncryptedPayload {
        encrypted: true,
        algorithm: ALGORITHM.to_string(),
        iv: hex::encode(nonce_bytes),
        tag: hex::encode(tag.as_ref()),
        ciphertext: hex::encode(in_out.as_slice()),
    })
}

/// Decrypt a payload under `key`.
///
/// Fails with [`BridgeError::Authentication`] when the tag does not verify,
/// which is how a wrong key or a tampered payload is detected.
pub fn decrypt(payload: &EncryptedPayload, key: &EncryptionKey) -> Result<Zeroizing<String>> {
    let (nonce, sealed) = payload.decode()?;
    let mut sealed = Zeroizing::new(sealed);

    let opening_key = aead_key(key)?;
    let plaintext = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(ALGORITHM.as_bytes()),
            sealed.as_mut_slice(),
        )
        .map_err(|_| BridgeError::Authentication)?;

    let text = std::str::from_utf8(plaintext)
        .map_err(|_| BridgeError::malformed_payload("decrypted secret is not UTF-8"))?;
    Ok(Zeroizing::new(text.to_string()))
}

/// Encryption bound to the installation key.
#[derive(Debug)]
pub struct EncryptionService {
    key: EncryptionKey,
    rng: SystemRandom,
}

impl EncryptionService {
    pub fn new(key: EncryptionKey) -> Self {
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedPayload> {
        encrypt_with(&self.rng, plaintext, &self.key)
    }

    pub fn decrypt(&self, payload: &EncryptedPayload) -> Result<Zeroizing<String>> {
        decrypt(payload, &self.key)
    }

    /// Fingerprint of the key this service encrypts with.
    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LEN;

    fn key(byte: u8) -> EncryptionKey {
        EncryptionKey::new([byte; KEY_LEN])
    }

    #[test]
    fn test_round_trip() {
        let k = key(7);
        for secret in ["", "hunter2", "päss wörd ✓", &"x".repeat(4096)] {
            let payload = encrypt(secret, &k).unwrap();
            assert_eq!(decrypt(&payload, &k).unwrap().as_str(), secret);
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = encrypt("secret", &key(1)).unwrap();
        assert!(payload.encrypted);
        assert_eq!(payload.algorithm, "aes-256-gcm");
        assert_eq!(payload.iv.len(), NONCE_LEN * 2);
        assert_eq!(payload.tag.len(), TAG_LEN * 2);
        assert_eq!(payload.ciphertext.len(), "secret".len() * 2);
        assert!(!payload.ciphertext.contains("secret"));

        let json = serde_json::to_value(&payload).unwrap();
        for field in ["encrypted", "algorithm", "iv", "tag", "ciphertext"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let payload = encrypt("secret", &key(1)).unwrap();
        let err = decrypt(&payload, &key(2)).unwrap_err();
        assert!(matches!(err, BridgeError::Authentication));
    }

    #[test]
    fn test_tampering_fails_authentication() {
        let k = key(3);
        let payload = encrypt("secret", &k).unwrap();

        let flip = |s: &str| {
            let mut bytes = hex::decode(s).unwrap();
            bytes[0] ^= 0x01;
            hex::encode(bytes)
        };

        let mut tampered = payload.clone();
        tampered.ciphertext = flip(&payload.ciphertext);
        assert!(matches!(decrypt(&tampered, &k), Err(BridgeError::Authentication)));

        let mut tampered = payload.clone();
        tampered.tag = flip(&payload.tag);
        assert!(matches!(decrypt(&tampered, &k), Err(BridgeError::Authentication)));

        let mut tampered = payload.clone();
        tampered.iv = flip(&payload.iv);
        assert!(matches!(decrypt(&tampered, &k), Err(BridgeError::Authentication)));
    }

    #[test]
    fn test_nonces_never_repeat() {
        let service = EncryptionService::new(key(9));
        let a = service.encrypt("same").unwrap();
        let b = service.encrypt("same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!((a.iv, a.ciphertext), (b.iv, b.ciphertext));
    }

    #[test]
    fn test_malformed_payloads() {
        let k = key(4);
        let good = encrypt("secret", &k).unwrap();

        let mut bad = good.clone();
        bad.algorithm = "des".into();
        assert!(matches!(decrypt(&bad, &k), Err(BridgeError::MalformedPayload(_))));

        let mut bad = good.clone();
        bad.iv = "zz".into();
        assert!(matches!(decrypt(&bad, &k), Err(BridgeError::MalformedPayload(_))));

        let mut bad = good.clone();
        bad.iv = "abcd".into();
        assert!(matches!(decrypt(&bad, &k), Err(BridgeError::MalformedPayload(_))));

        let mut bad = good.clone();
        bad.tag = good.tag[..8].to_string();
        assert!(matches!(decrypt(&bad, &k), Err(BridgeError::MalformedPayload(_))));

        let mut bad = good;
        bad.encrypted = false;
        assert!(bad.check_shape().is_err());
    }

    #[test]
    fn test_service_round_trip() {
        let service = EncryptionService::new(EncryptionKey::from_passphrase("pw").unwrap());
        let payload = service.encrypt("db-password").unwrap();
        assert_eq!(service.decrypt(&payload).unwrap().as_str(), "db-password");
        assert_eq!(service.key_fingerprint().len(), 16);
    }
}
