//! Provider: a cryptographer bound to a store.
//!
//! `set_data` seals the lookup key and the value separately and hands both
//! to the store; `get_data` seals the lookup key again, reads, and opens
//! the value. Errors carry the stage that failed.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::crypto::{CryptoError, Cryptographer};
use crate::storage::{SecretStore, StorageError, StoreKind};

/// Stage of a provider operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EncodeKey,
    EncodeValue,
    Save,
    Read,
    Decode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EncodeKey => "encode_key",
            Self::EncodeValue => "encode_value",
            Self::Save => "save",
            Self::Read => "read",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("cannot encode key: {0}")]
    EncodeKey(#[source] CryptoError),

    #[error("cannot encode value: {0}")]
    EncodeValue(#[source] CryptoError),

    #[error("cannot save data: {0}")]
    Save(#[source] StorageError),

    #[error("cannot read data: {0}")]
    Read(#[source] StorageError),

    #[error("cannot decode data: {0}")]
    Decode(#[source] CryptoError),
}

impl ProviderError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::EncodeKey(_) => Stage::EncodeKey,
            Self::EncodeValue(_) => Stage::EncodeValue,
            Self::Save(_) => Stage::Save,
            Self::Read(_) => Stage::Read,
            Self::Decode(_) => Stage::Decode,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read(e) if e.is_not_found())
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Decode(e) if e.is_authentication_failure())
    }

    /// Empty keys are caller errors rather than backend failures.
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::Save(StorageError::InvalidKey) | Self::Read(StorageError::InvalidKey))
    }
}

/// Encrypting facade over a [`SecretStore`].
pub struct Provider {
    cryptographer: Box<dyn Cryptographer>,
    store: Arc<dyn SecretStore>,
}

impl Provider {
    pub fn new(cryptographer: impl Cryptographer + 'static, store: Arc<dyn SecretStore>) -> Self {
        Self { cryptographer: Box::new(cryptographer), store }
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Stores `value` under `key`. An empty value deletes the record.
    #[instrument(skip_all, fields(backend = %self.store.kind(), key_len = key.len(), value_len = value.len()))]
    pub async fn set_data(&self, key: &[u8], value: &[u8]) -> Result<(), ProviderError> {
        if key.is_empty() {
            return Err(ProviderError::Save(StorageError::InvalidKey));
        }
        let sealed_key = self.cryptographer.encode_key(key).map_err(ProviderError::EncodeKey)?;

        // Sealing an empty value would produce a bare tag and defeat deletion.
        let sealed_value = if value.is_empty() {
            Vec::new()
        } else {
            self.cryptographer.encode(value).map_err(ProviderError::EncodeValue)?
        };

        self.store.save_data(&sealed_key, &sealed_value).await.map_err(ProviderError::Save)?;
        debug!("secret saved");
        Ok(())
    }

    /// Fetches and decrypts the value under `key`, `None` when absent.
    #[instrument(skip_all, fields(backend = %self.store.kind(), key_len = key.len()))]
    pub async fn get_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ProviderError> {
        if key.is_empty() {
            return Err(ProviderError::Read(StorageError::InvalidKey));
        }
        let sealed_key = self.cryptographer.encode_key(key).map_err(ProviderError::EncodeKey)?;

        let Some(sealed_value) =
            self.store.read_data(&sealed_key).await.map_err(ProviderError::Read)?
        else {
            debug!("secret not found");
            return Ok(None);
        };

        let value = self.cryptographer.decode(&sealed_value).map_err(ProviderError::Decode)?;
        Ok(Some(value))
    }

    /// Like [`get_data`](Self::get_data) but treats absence as `Read(NotFound)`.
    pub async fn require_data(&self, key: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.get_data(key).await?.ok_or(ProviderError::Read(StorageError::NotFound))
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").field("store", &self.store).finish_non_exhaustive()
    }
}
