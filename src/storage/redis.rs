//! Redis-backed secret store.
//!
//! Each sealed key is hex-encoded into a Redis key and the sealed value is
//! stored as raw bytes.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, instrument};

use super::{ensure_key, SecretStore, StorageError, StoreKind};

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Opens a connection from `client` and verifies it with PING.
    #[instrument(skip_all)]
    pub async fn connect(client: &redis::Client) -> Result<Self, StorageError> {
        let connection = client.get_multiplexed_async_connection().await.map_err(|e| {
            StorageError::connection_failure(StoreKind::Redis, format!("cannot connect: {}", e))
        })?;

        let store = Self { connection };
        store.ping().await?;
        debug!("Redis connection established");
        Ok(store)
    }

    /// Parses `url` and connects.
    pub async fn open(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(|e| {
            StorageError::connection_failure(StoreKind::Redis, format!("invalid URL: {}", e))
        })?;
        let store = Self::connect(&client).await?;
        info!("Opened Redis store");
        Ok(store)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StorageError::connection_failure(StoreKind::Redis, format!("PING failed: {}", e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for RedisStore {
    #[instrument(skip_all, fields(backend = "redis", value_len = value.len()))]
    async fn save_data(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        ensure_key(key)?;
        let mut connection = self.connection.clone();
        let field = hex::encode(key);

        if value.is_empty() {
            let removed: i64 = connection
                .del(&field)
                .await
                .map_err(|e| StorageError::redis(e, "DEL failed"))?;
            debug!(removed, "Deleted record");
            return Ok(());
        }

        let _: () = connection
            .set(&field, value)
            .await
            .map_err(|e| StorageError::redis(e, "SET failed"))?;
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "redis"))]
    async fn read_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        ensure_key(key)?;
        let mut connection = self.connection.clone();

        let value: Option<Vec<u8>> = connection
            .get(hex::encode(key))
            .await
            .map_err(|e| StorageError::redis(e, "GET failed"))?;
        Ok(value)
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Redis
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.ping().await
    }
}
