//! # Structured Logging
//!
//! Subscriber initialisation and span helpers built on the tracing ecosystem.
//! Secret material never appears in spans; callers record lengths and
//! backend names only.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Create a tracing span for request tracking.
///
/// ```rust,ignore
/// let span = request_span!("GET", "/");
/// let span = request_span!("POST", "/", method_name = "local");
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.log_level`. Calling this again after a
/// subscriber is installed is a no-op.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().json().with_env_filter(filter).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "Global subscriber already installed");
    }
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(settings: &crate::config::Settings) {
    tracing::info!(
        service_name = %settings.observability.service_name,
        server_address = %settings.server.bind_address(),
        file_backend = settings.storage.file_path.is_some(),
        redis_backend = settings.storage.redis_url.is_some(),
        postgres_backend = settings.storage.database.is_some(),
        json_logging = settings.observability.json_logging,
        "Secret store configuration"
    );
}
