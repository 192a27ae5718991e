//! # Storage and Persistence
//!
//! Pluggable byte-keyed stores that hold sealed secrets. Stores never see
//! plaintext: keys and values arrive already encrypted by the provider.
//!
//! All backends share the same contract:
//! - an empty key is rejected with [`StorageError::InvalidKey`]
//! - saving an empty value deletes the record
//! - reading a missing record yields `Ok(None)`

pub mod error;
pub mod file;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::config::DatabaseConfig;
pub use error::StorageError;
pub use file::FileStore;
pub use migrations::{list_applied_migrations, run_migrations, MigrationInfo};
pub use pool::{create_pool, DbPool};
pub use postgres::PostgresStore;
pub use self::redis::RedisStore;

/// Kind of backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Single JSON document on the local filesystem
    File,
    /// Redis key space
    Redis,
    /// PostgreSQL `secrets` table
    Postgres,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Redis => "redis",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for secret stores
///
/// Implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Insert or overwrite the record for `key`. An empty `value` deletes it.
    async fn save_data(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Fetch the record for `key`, or `None` when absent.
    async fn read_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn kind(&self) -> StoreKind;

    /// Returns Ok(()) if the backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}

pub(crate) fn ensure_key(key: &[u8]) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey);
    }
    Ok(())
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| StorageError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
