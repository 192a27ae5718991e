//! # HTTP API
//!
//! `GET /?key=..&method=..` and `POST /` read and write secrets through the
//! method registry; `/ping` and `/health` are liveness checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use routes::{build_router, build_router_with_timeout, ApiState};
pub use server::{serve, shutdown_signal, start_api_server};
