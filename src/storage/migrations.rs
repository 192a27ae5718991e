//! # Database Migration Management
//!
//! Applies `.sql` files from a directory to PostgreSQL in filename order.
//! Each file runs in its own transaction and is recorded in
//! `_secret_migrations`; versions already recorded are skipped.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::Row;
use std::path::Path;
use tracing::{error, info, warn};

/// Migration information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub checksum: Vec<u8>,
}

/// Load migration files from filesystem
fn load_migrations(dir: &Path) -> Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        return Err(Error::validation(format!("Migrations directory not found: {}", dir.display())));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::io(e, format!("Failed to read migrations directory {}", dir.display()))
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, "Failed to read migration file entry"))?;

        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }

        let filename = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            Error::validation(format!("Invalid migration filename: {}", path.display()))
        })?;

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::io(e, format!("Failed to read migration file {}", path.display()))
        })?;

        migrations.push((filename.to_string(), content));
    }

    // Sort migrations by filename (which should include timestamp)
    migrations.sort_by(|a, b| a.0.cmp(&b.0));

    info!("Loaded {} migration files from {}", migrations.len(), dir.display());
    Ok(migrations)
}

/// Run all pending database migrations found in `dir`
pub async fn run_migrations(pool: &DbPool, dir: &Path) -> Result<()> {
    info!("Starting database migration process");

    create_migration_table(pool).await?;
    let migrations = load_migrations(dir)?;
    let applied = get_applied_checksums(pool).await?;

    let mut migrations_run = 0;
    for (filename, sql) in &migrations {
        let version = extract_version_from_filename(filename)?;
        let checksum = calculate_checksum(sql);

        if let Some((_, recorded)) = applied.iter().find(|(v, _)| *v == version) {
            if *recorded != checksum {
                warn!(version, "Applied migration differs from file on disk: {}", filename);
            }
            info!(version, "Migration already applied: {}", filename);
            continue;
        }

        info!(version, "Running migration: {}", filename);
        let start_time = std::time::Instant::now();

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| Error::database(e, "Failed to start migration transaction"))?;

        // raw_sql allows multi-statement migration files
        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = filename, "Migration failed");
            Error::database(e, format!("Migration failed: {}", filename))
        })?;

        sqlx::query(
            "INSERT INTO _secret_migrations (version, description, checksum, installed_on) VALUES ($1, $2, $3, $4)",
        )
        .bind(version)
        .bind(filename)
        .bind(&checksum)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, migration = filename, "Failed to record migration");
            Error::database(e, format!("Failed to record migration: {}", filename))
        })?;

        tx.commit()
            .await
            .map_err(|e| Error::database(e, "Failed to commit migration transaction"))?;

        migrations_run += 1;
        info!(
            version,
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "Migration completed: {}",
            filename
        );
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _secret_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BYTEA NOT NULL,
            installed_on TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#,
    )
    .execute(pool)
    .await
    .map_err(|e| Error::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

async fn get_applied_checksums(pool: &DbPool) -> Result<Vec<(i64, Vec<u8>)>> {
    let rows = sqlx::query("SELECT version, checksum FROM _secret_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::database(e, "Failed to get applied migrations"))?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get::<i64, _>("version"), row.get::<Vec<u8>, _>("checksum")))
        .collect())
}

/// Extract version number from migration filename
fn extract_version_from_filename(filename: &str) -> Result<i64> {
    let version_str = filename
        .split('_')
        .next()
        .ok_or_else(|| Error::validation(format!("Invalid migration filename: {}", filename)))?;

    version_str
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("Invalid version in filename: {}", filename)))
}

/// Calculate checksum for migration content
fn calculate_checksum(content: &str) -> Vec<u8> {
    Sha256::digest(content.as_bytes()).to_vec()
}

/// List all applied migrations
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    let rows = sqlx::query(
        "SELECT version, description, checksum, installed_on FROM _secret_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => Ok(rows
            .into_iter()
            .map(|row| MigrationInfo {
                version: row.get("version"),
                description: row.get("description"),
                installed_on: row.get("installed_on"),
                checksum: row.get("checksum"),
            })
            .collect()),
        Err(sqlx::Error::Database(db_err))
            if db_err.message().contains("relation \"_secret_migrations\" does not exist") =>
        {
            Ok(Vec::new())
        }
        Err(e) => Err(Error::database(e, "Failed to list applied migrations")),
    }
}
