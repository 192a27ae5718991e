//! Method dispatch
//!
//! Requests name a storage method ("local", "remote"). The registry maps
//! that name to a [`MethodFactory`] which builds a per-request [`Provider`]
//! keyed by the caller's passphrase. The provider is handed out inside a
//! [`ProviderLease`] whose teardown runs exactly once when the lease drops,
//! whether the request succeeded, failed or panicked.

pub mod factories;

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::provider::Provider;
use crate::storage::{StorageError, StoreKind};

pub use factories::{build_registry, open_store, RedisMethod, SharedStoreMethod};

/// Method backed by the file store
pub const LOCAL_METHOD: &str = "local";

/// Method backed by Redis or PostgreSQL
pub const REMOTE_METHOD: &str = "remote";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("method {method:?} is not registered")]
    UnknownMethod { method: String },

    #[error("key parameter is required")]
    MissingKeyParam,

    #[error("cannot acquire backend: {0}")]
    Backend(#[from] StorageError),
}

impl DispatchError {
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod { method: method.into() }
    }
}

/// Cleanup callback run after a request's provider is dropped
pub type Teardown = Box<dyn FnOnce() + Send>;

/// Runs its teardown exactly once, on drop.
pub struct TeardownGuard {
    teardown: Option<Teardown>,
}

impl TeardownGuard {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self { teardown: Some(Box::new(teardown)) }
    }

    pub fn noop() -> Self {
        Self { teardown: None }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for TeardownGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownGuard").field("armed", &self.teardown.is_some()).finish()
    }
}

/// A provider scoped to one request.
// Field order matters: the provider drops before the guard runs.
#[derive(Debug)]
pub struct ProviderLease {
    provider: Provider,
    _teardown: TeardownGuard,
}

impl ProviderLease {
    pub fn new(provider: Provider, teardown: TeardownGuard) -> Self {
        Self { provider, _teardown: teardown }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

impl Deref for ProviderLease {
    type Target = Provider;

    fn deref(&self) -> &Provider {
        &self.provider
    }
}

/// Builds request-scoped providers for one method.
#[async_trait]
pub trait MethodFactory: Send + Sync + fmt::Debug {
    async fn lease(&self, passphrase: &[u8]) -> Result<ProviderLease, DispatchError>;

    fn store_kind(&self) -> StoreKind;

    /// Returns Ok(()) if the method's backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Immutable name → factory table shared by all request handlers.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn MethodFactory>>,
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry").field("methods", &self.method_names()).finish()
    }
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn MethodFactory>) {
        let name = name.into();
        info!(method = %name, backend = %factory.store_kind(), "Registering storage method");
        if self.methods.insert(name.clone(), factory).is_some() {
            warn!(method = %name, "Replaced previously registered method");
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn resolve(&self, method: &str) -> Result<Arc<dyn MethodFactory>, DispatchError> {
        self.methods.get(method).cloned().ok_or_else(|| DispatchError::unknown_method(method))
    }

    /// Health of every registered method, sorted by name
    pub async fn check_health(&self) -> Vec<(String, Result<(), StorageError>)> {
        let mut results = Vec::with_capacity(self.methods.len());
        for name in self.method_names() {
            if let Some(factory) = self.methods.get(name) {
                let result = factory.health_check().await;
                if let Err(e) = &result {
                    warn!(method = %name, error = %e, "Storage method unhealthy");
                }
                results.push((name.to_string(), result));
            }
        }
        results
    }

    /// Resolve `method` and build a provider for `passphrase`
    #[instrument(skip(self, passphrase), fields(method = %method))]
    pub async fn lease(
        &self,
        method: &str,
        passphrase: &[u8],
    ) -> Result<ProviderLease, DispatchError> {
        let factory = self.resolve(method)?;
        let lease = factory.lease(passphrase).await?;
        debug!(backend = %lease.store_kind(), "Provider leased");
        Ok(lease)
    }
}
