//! Error types for secret store backends.

use thiserror::Error;

use super::StoreKind;

/// Errors raised by a [`SecretStore`](super::SecretStore).
///
/// Neither keys nor values are ever echoed into messages.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The lookup key was empty.
    #[error("invalid key: key must not be empty")]
    InvalidKey,

    /// No record exists for the lookup key.
    #[error("secret not found")]
    NotFound,

    /// The backend could not be reached.
    #[error("{backend} connection failed: {message}")]
    ConnectionFailure { backend: StoreKind, message: String },

    /// Filesystem errors from the file backend.
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// The file backend's document could not be encoded or decoded.
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Stored bytes could not be decoded back into a record.
    #[error("{backend} holds a corrupted record: {message}")]
    Corrupted { backend: StoreKind, message: String },

    /// Query or transaction failures from the PostgreSQL backend.
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Command failures from the Redis backend.
    #[error("Redis error: {context}")]
    Redis {
        #[source]
        source: redis::RedisError,
        context: String,
    },
}

impl StorageError {
    pub fn connection_failure(backend: StoreKind, message: impl Into<String>) -> Self {
        Self::ConnectionFailure { backend, message: message.into() }
    }

    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io { source, context: context.into() }
    }

    pub fn serialization(source: serde_json::Error, context: impl Into<String>) -> Self {
        Self::Serialization { source, context: context.into() }
    }

    pub fn corrupted(backend: StoreKind, message: impl Into<String>) -> Self {
        Self::Corrupted { backend, message: message.into() }
    }

    pub fn database(source: sqlx::Error, context: impl Into<String>) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Classifies Redis failures: transport problems become `ConnectionFailure`.
    pub fn redis(source: redis::RedisError, context: impl Into<String>) -> Self {
        if source.is_io_error() || source.is_connection_refusal() || source.is_connection_dropped()
        {
            return Self::ConnectionFailure {
                backend: StoreKind::Redis,
                message: format!("{}: {}", context.into(), source),
            };
        }
        Self::Redis { source, context: context.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
