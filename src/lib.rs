//! # Secret Store
//!
//! A small key-value store for secrets. Values are sealed with AES-256-GCM
//! under a key derived from a caller-supplied passphrase, and lookup keys are
//! sealed deterministically so the backend never sees plaintext names.
//!
//! ## Architecture
//!
//! ```text
//! CLI / HTTP API → Method Registry → Provider → Cryptographer
//!                                        ↓
//!                         SecretStore (file | Redis | PostgreSQL)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use secret_store::{crypto::AesGcmCryptographer, storage::FileStore, Provider, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = FileStore::open("secrets.json").await?;
//!     let provider = Provider::new(AesGcmCryptographer::new(b"pw"), Arc::new(store));
//!     provider.set_data(b"alpha", b"top secret").await.ok();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod storage;

// Re-export commonly used types and traits
pub use config::Settings;
pub use crypto::{AesGcmCryptographer, Cryptographer};
pub use dispatch::{MethodRegistry, ProviderLease};
pub use errors::{Error, Result};
pub use provider::{Provider, ProviderError};
pub use storage::{SecretStore, StoreKind};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
