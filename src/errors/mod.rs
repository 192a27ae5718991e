//! # Error Handling
//!
//! Crate-level error used at the process boundary (startup, configuration,
//! server bootstrap). Component errors (`CryptoError`, `StorageError`,
//! `ProviderError`, `DispatchError`) live next to their modules.

use crate::storage::StorageError;

/// Custom result type for secret-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the secret store
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Network transport errors (bind, serve)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Database errors outside of a store operation (pool, migrations)
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Store errors surfaced during startup
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        let mut first_field = None;

        for (field, field_errors) in errors.field_errors() {
            first_field.get_or_insert_with(|| field.to_string());
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                messages.push(message);
            }
        }

        if messages.is_empty() {
            messages.push(errors.to_string());
        }

        Self::Validation { message: messages.join("; "), field: first_field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        assert_eq!(Error::config("bad").to_string(), "Configuration error: bad");
        assert_eq!(Error::transport("down").to_string(), "Transport error: down");
        assert_eq!(Error::internal("oops").to_string(), "Internal error: oops");

        match Error::validation("port must be set") {
            Error::Validation { field, .. } => assert!(field.is_none()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: Error = StorageError::NotFound.into();
        assert_eq!(err.to_string(), "secret not found");
    }
}
