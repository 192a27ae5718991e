//! PostgreSQL-backed secret store.
//!
//! Records live in `secrets (key TEXT PRIMARY KEY, value TEXT)` with both
//! columns hex-encoded. Writes run inside a transaction.

use async_trait::async_trait;
use sqlx::FromRow;
use tracing::{debug, error, instrument};

use super::{check_connection, ensure_key, DbPool, SecretStore, StorageError, StoreKind};

/// Database row for a single secret
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    value: String,
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: DbPool,
}

impl PostgresStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SecretStore for PostgresStore {
    #[instrument(skip_all, fields(backend = "postgres", value_len = value.len()))]
    async fn save_data(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        ensure_key(key)?;
        let field = hex::encode(key);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::database(e, "Failed to start transaction"))?;

        let statement = if value.is_empty() {
            sqlx::query("DELETE FROM secrets WHERE key = $1").bind(&field)
        } else {
            sqlx::query(
                "INSERT INTO secrets (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(&field)
            .bind(hex::encode(value))
        };

        match statement.execute(&mut *tx).await {
            Ok(result) => {
                debug!(rows_affected = result.rows_affected(), "Secret statement executed");
            }
            Err(e) => {
                error!(error = %e, "Secret write failed, rolling back");
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                return Err(StorageError::database(e, "Failed to save secret"));
            }
        }

        tx.commit().await.map_err(|e| StorageError::database(e, "Failed to commit secret"))
    }

    #[instrument(skip_all, fields(backend = "postgres"))]
    async fn read_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        ensure_key(key)?;

        let row = sqlx::query_as::<_, SecretRow>("SELECT value FROM secrets WHERE key = $1 LIMIT 1")
            .bind(hex::encode(key))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Database query failed");
                StorageError::database(e, "Failed to fetch secret")
            })?;

        row.map(|row| {
            hex::decode(row.value)
                .map_err(|_| StorageError::corrupted(StoreKind::Postgres, "value is not valid hex"))
        })
        .transpose()
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        check_connection(&self.pool).await
    }
}
