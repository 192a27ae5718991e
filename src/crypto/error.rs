use thiserror::Error;

/// Failures raised while sealing or opening secret material.
///
/// Messages never include key, plaintext or ciphertext bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The derived key was rejected by the cipher.
    #[error("invalid encryption key")]
    InvalidKey,

    /// The nonce source could not produce enough bytes.
    #[error("failed to generate nonce")]
    RandomnessFailure,

    /// Input is non-empty but too short to hold a nonce and a tag.
    #[error("malformed ciphertext: expected at least {minimum} bytes, got {actual}")]
    MalformedCiphertext { minimum: usize, actual: usize },

    /// Tag verification failed: wrong passphrase or tampered data.
    #[error("authentication failed - wrong passphrase or tampered ciphertext")]
    AuthenticationFailure,
}

impl CryptoError {
    pub fn malformed(actual: usize) -> Self {
        Self::MalformedCiphertext { minimum: super::NONCE_SIZE + super::TAG_SIZE, actual }
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailure)
    }
}
