//! # Configuration Management
//!
//! Typed settings loaded from `SECRET_*` environment variables. The CLI
//! layers its flags on top of these values.

pub mod settings;

pub use settings::{
    BackendSelection, DatabaseConfig, ObservabilityConfig, ServerConfig, Settings, StorageConfig,
};

use crate::errors::Result;

impl Settings {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = Self {
            server: ServerConfig::from_env(),
            storage: StorageConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        };
        settings.validate()?;
        Ok(settings)
    }
}
