//! # Observability Infrastructure
//!
//! Structured logging for the secret store. HTTP requests are traced by the
//! router's `TraceLayer`, which opens a [`request_span!`](crate::request_span)
//! per request.

pub mod logging;

pub use logging::{init_logging, log_config_info};
