//! Passphrase-based authenticated encryption.
//!
//! Every sealed blob is laid out as `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! The AES-256 key is the SHA-256 digest of the caller's passphrase, so any
//! passphrase length (including empty) is accepted.

pub mod aes_gcm;
pub mod error;
pub mod nonce;

pub use aes_gcm::AesGcmCryptographer;
pub use error::CryptoError;
pub use nonce::{NonceSource, RepeatingNonce, SystemNonce};

/// Size of AES-256-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Size of AES-256-GCM tag in bytes
pub const TAG_SIZE: usize = 16;

/// Size of the derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Seals and opens secret material.
///
/// `encode` is randomized: sealing the same plaintext twice yields different
/// bytes. `encode_key` is deterministic and independent of the passphrase so
/// that a storage lookup key can be recomputed on every request.
pub trait Cryptographer: Send + Sync {
    fn encode(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Opens a blob produced by `encode`. Empty input decodes to empty output.
    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn encode_key(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
