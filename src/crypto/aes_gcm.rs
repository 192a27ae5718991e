//! AES-256-GCM cryptographer keyed by SHA-256(passphrase).
//!
//! Values are sealed under a random nonce per call. Lookup keys are sealed
//! deterministically under a key and nonce derived from the lookup key
//! itself, which keeps the stored key stable across passphrases; a wrong
//! passphrase therefore finds the record and fails tag verification on
//! the value instead of silently missing.

use std::sync::Arc;

use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use super::nonce::{NonceSource, SystemNonce};
use super::{CryptoError, Cryptographer, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

const LOOKUP_KEY_DOMAIN: &[u8] = b"secret-store/lookup-key/v1";
const LOOKUP_NONCE_DOMAIN: &[u8] = b"secret-store/lookup-nonce/v1";

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// AES-256-GCM implementation of [`Cryptographer`].
#[derive(Clone)]
pub struct AesGcmCryptographer {
    key_bytes: Zeroizing<[u8; KEY_SIZE]>,
    nonces: Arc<dyn NonceSource>,
}

impl AesGcmCryptographer {
    /// Builds a cryptographer that draws nonces from the system CSPRNG.
    pub fn new(passphrase: &[u8]) -> Self {
        Self::with_nonce_source(passphrase, Arc::new(SystemNonce::new()))
    }

    /// Builds a cryptographer with an explicit nonce source.
    pub fn with_nonce_source(passphrase: &[u8], nonces: Arc<dyn NonceSource>) -> Self {
        Self { key_bytes: derive_key(passphrase, &[]), nonces }
    }
}

impl Cryptographer for AesGcmCryptographer {
    #[instrument(skip(self, plaintext), fields(plaintext_len = plaintext.len()))]
    fn encode(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.nonces.fill(&mut nonce_bytes)?;

        let sealed = seal(&self.key_bytes, nonce_bytes, plaintext)?;
        debug!(sealed_len = sealed.len(), "sealed value");
        Ok(sealed)
    }

    #[instrument(skip(self, encoded), fields(encoded_len = encoded.len()))]
    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CryptoError> {
        open(&self.key_bytes, encoded)
    }

    #[instrument(skip_all, fields(key_len = key.len()))]
    fn encode_key(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let lookup_key = derive_key(LOOKUP_KEY_DOMAIN, key);
        let digest = Sha256::new().chain_update(LOOKUP_NONCE_DOMAIN).chain_update(key).finalize();
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&digest[..NONCE_SIZE]);

        seal(&lookup_key, nonce_bytes, key)
    }
}

impl std::fmt::Debug for AesGcmCryptographer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCryptographer").field("key_bytes", &"[REDACTED]").finish()
    }
}

fn derive_key(prefix: &[u8], material: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    let digest = Sha256::new().chain_update(prefix).chain_update(material).finalize();
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(digest.as_slice());
    key
}

fn seal(
    key_bytes: &[u8; KEY_SIZE],
    nonce_bytes: [u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let unbound_key =
        UnboundKey::new(&AES_256_GCM, key_bytes).map_err(|_| CryptoError::InvalidKey)?;
    let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

    let mut out = Vec::with_capacity(NONCE_SIZE + plaintext.len() + TAG_SIZE);
    out.extend_from_slice(&nonce_bytes);
    let mut ciphertext = plaintext.to_vec();
    ciphertext.reserve(TAG_SIZE);

    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
        .map_err(|_| CryptoError::InvalidKey)?;

    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(key_bytes: &[u8; KEY_SIZE], encoded: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    if encoded.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::malformed(encoded.len()));
    }

    let (nonce_slice, sealed) = encoded.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce_slice);

    let unbound_key =
        UnboundKey::new(&AES_256_GCM, key_bytes).map_err(|_| CryptoError::InvalidKey)?;
    let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

    let mut buffer = sealed.to_vec();
    let plaintext = opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| {
        warn!("tag verification failed");
        CryptoError::AuthenticationFailure
    })?;

    Ok(plaintext.to_vec())
}
