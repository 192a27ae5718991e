use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::dispatch::MethodRegistry;

use super::handlers::{get_by_key_handler, health_handler, ping_handler, set_by_key_handler};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<MethodRegistry>,
}

pub fn build_router(registry: Arc<MethodRegistry>) -> Router {
    Router::new()
        .route("/", get(get_by_key_handler).post(set_by_key_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .with_state(ApiState { registry })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    crate::request_span!(request.method(), request.uri().path())
                }),
        )
}

/// Router with a per-request timeout (responds 408 when exceeded)
pub fn build_router_with_timeout(registry: Arc<MethodRegistry>, timeout: Duration) -> Router {
    build_router(registry).layer(TimeoutLayer::new(timeout))
}
