//! Method factories and registry wiring.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{DispatchError, MethodFactory, MethodRegistry, ProviderLease, TeardownGuard};
use super::{LOCAL_METHOD, REMOTE_METHOD};
use crate::config::{BackendSelection, DatabaseConfig, StorageConfig};
use crate::crypto::AesGcmCryptographer;
use crate::errors::Result;
use crate::provider::Provider;
use crate::storage::{
    check_connection, create_pool, FileStore, PostgresStore, RedisStore, SecretStore, StorageError,
    StoreKind,
};

/// Hands out providers over one long-lived store (file, PostgreSQL pool).
#[derive(Debug, Clone)]
pub struct SharedStoreMethod {
    store: Arc<dyn SecretStore>,
}

impl SharedStoreMethod {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MethodFactory for SharedStoreMethod {
    async fn lease(&self, passphrase: &[u8]) -> std::result::Result<ProviderLease, DispatchError> {
        let provider = Provider::new(AesGcmCryptographer::new(passphrase), self.store.clone());
        Ok(ProviderLease::new(provider, TeardownGuard::noop()))
    }

    fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    async fn health_check(&self) -> std::result::Result<(), StorageError> {
        self.store.health_check().await
    }
}

/// Opens a dedicated Redis connection for every request.
#[derive(Debug, Clone)]
pub struct RedisMethod {
    client: redis::Client,
}

impl RedisMethod {
    /// Parses `url` and checks that the server answers PING.
    pub async fn connect(url: &str) -> std::result::Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(|e| {
            StorageError::connection_failure(StoreKind::Redis, format!("invalid URL: {}", e))
        })?;
        RedisStore::connect(&client).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MethodFactory for RedisMethod {
    async fn lease(&self, passphrase: &[u8]) -> std::result::Result<ProviderLease, DispatchError> {
        let store = Arc::new(RedisStore::connect(&self.client).await?);
        let provider = Provider::new(AesGcmCryptographer::new(passphrase), store.clone());

        let opened = Instant::now();
        Ok(ProviderLease::new(
            provider,
            TeardownGuard::new(move || {
                // Last handle to the request's connection; dropping it closes the socket.
                drop(store);
                debug!(held_ms = opened.elapsed().as_millis() as u64, "Released Redis connection");
            }),
        ))
    }

    fn store_kind(&self) -> StoreKind {
        StoreKind::Redis
    }

    /// Opens a throwaway connection; `connect` verifies it with PING.
    async fn health_check(&self) -> std::result::Result<(), StorageError> {
        RedisStore::connect(&self.client).await.map(|_| ())
    }
}

async fn open_postgres(config: &DatabaseConfig) -> Result<PostgresStore> {
    let pool = create_pool(config).await?;
    check_connection(&pool).await?;
    Ok(PostgresStore::new(pool))
}

/// Opens the single store picked by `storage.selection()` for one-shot commands.
pub async fn open_store(storage: &StorageConfig) -> Result<Arc<dyn SecretStore>> {
    let store: Arc<dyn SecretStore> = match storage.selection() {
        BackendSelection::Redis(url) => Arc::new(RedisStore::open(&url).await?),
        BackendSelection::Postgres(config) => Arc::new(open_postgres(&config).await?),
        BackendSelection::File(path) => Arc::new(FileStore::open(&path).await?),
    };
    info!(backend = %store.kind(), "Opened secret store");
    Ok(store)
}

/// Registers "local" for a file path and "remote" for Redis or PostgreSQL.
///
/// Redis takes precedence when both remote backends are configured.
pub async fn build_registry(storage: &StorageConfig) -> Result<MethodRegistry> {
    storage.validate_for_server()?;
    let mut registry = MethodRegistry::new();

    if let Some(path) = &storage.file_path {
        let store = FileStore::open(path).await?;
        registry.register(LOCAL_METHOD, Arc::new(SharedStoreMethod::new(Arc::new(store))));
    }

    if let Some(url) = &storage.redis_url {
        if storage.database.is_some() {
            warn!("Both Redis and PostgreSQL configured; using Redis for the remote method");
        }
        let method = RedisMethod::connect(url).await?;
        registry.register(REMOTE_METHOD, Arc::new(method));
    } else if let Some(database) = &storage.database {
        let store = open_postgres(database).await?;
        registry.register(REMOTE_METHOD, Arc::new(SharedStoreMethod::new(Arc::new(store))));
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_registry_with_file_only() {
        let dir = TempDir::new().unwrap();
        let storage =
            StorageConfig { file_path: Some(dir.path().join("file.txt")), ..Default::default() };

        let registry = build_registry(&storage).await.unwrap();
        assert_eq!(registry.method_names(), vec![LOCAL_METHOD]);
        assert_eq!(registry.resolve(LOCAL_METHOD).unwrap().store_kind(), StoreKind::File);
    }

    #[tokio::test]
    async fn test_build_registry_requires_a_backend() {
        assert!(build_registry(&StorageConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_build_registry_fails_on_unreachable_redis() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            file_path: Some(dir.path().join("file.txt")),
            redis_url: Some("redis://127.0.0.1:1".to_string()),
            ..Default::default()
        };

        assert!(build_registry(&storage).await.is_err());
    }

    #[tokio::test]
    async fn test_open_store_defaults_to_file() {
        let dir = TempDir::new().unwrap();
        let storage =
            StorageConfig { file_path: Some(dir.path().join("file.txt")), ..Default::default() };

        let store = open_store(&storage).await.unwrap();
        assert_eq!(store.kind(), StoreKind::File);
        assert!(dir.path().join("file.txt").exists());
    }

    #[tokio::test]
    async fn test_shared_store_leases_share_records() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("file.txt")).await.unwrap();
        let method = SharedStoreMethod::new(Arc::new(store));

        method.lease(b"pw").await.unwrap().set_data(b"k", b"v").await.unwrap();
        let value = method.lease(b"pw").await.unwrap().require_data(b"k").await.unwrap();
        assert_eq!(value, b"v");
    }
}
