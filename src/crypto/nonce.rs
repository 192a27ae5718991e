//! Nonce sources for AES-256-GCM sealing.
//!
//! Production sealing always draws from [`SystemNonce`]. [`RepeatingNonce`]
//! exists so tests can pin ciphertext bytes.

use ring::rand::{SecureRandom, SystemRandom};

use super::CryptoError;

/// Something that can fill a nonce buffer.
pub trait NonceSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// Cryptographically secure nonces from the operating system.
#[derive(Clone)]
pub struct SystemNonce {
    rng: SystemRandom,
}

impl SystemNonce {
    pub fn new() -> Self {
        Self { rng: SystemRandom::new() }
    }
}

impl Default for SystemNonce {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceSource for SystemNonce {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        self.rng.fill(dest).map_err(|_| CryptoError::RandomnessFailure)
    }
}

impl std::fmt::Debug for SystemNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SystemNonce")
    }
}

/// Deterministic source that cycles over a fixed byte pattern.
///
/// Never use outside of tests: repeating a nonce under one key breaks GCM.
/// An empty pattern yields all-zero nonces.
#[derive(Debug, Clone)]
pub struct RepeatingNonce {
    pattern: Vec<u8>,
}

impl RepeatingNonce {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self { pattern: pattern.into() }
    }
}

impl NonceSource for RepeatingNonce {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        if self.pattern.is_empty() {
            dest.fill(0);
            return Ok(());
        }
        for (slot, byte) in dest.iter_mut().zip(self.pattern.iter().cycle()) {
            *slot = *byte;
        }
        Ok(())
    }
}

/// Source that always fails; lets tests reach the randomness error path.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct FailingNonce;

#[cfg(test)]
impl NonceSource for FailingNonce {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), CryptoError> {
        Err(CryptoError::RandomnessFailure)
    }
}
