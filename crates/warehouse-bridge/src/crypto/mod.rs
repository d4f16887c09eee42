//! Encryption of stored credentials.
//!
//! - [`key`]: the 256-bit installation key, generated or passphrase-derived
//! - [`cipher`]: AES-256-GCM encryption into [`EncryptedPayload`]
//! - [`keystore`]: the key file that marks an installation as initialized
//!
//! Every artifact, vault entry and saved connection of an installation is
//! encrypted under the same key.

pub mod cipher;
pub mod key;
pub mod keystore;

pub use cipher::{decrypt, encrypt, EncryptedPayload, EncryptionService, ALGORITHM};
pub use key::EncryptionKey;
pub use keystore::KeyStore;
