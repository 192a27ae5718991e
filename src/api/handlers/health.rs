//! Liveness endpoints

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::routes::ApiState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when every method's backend answers, "degraded" otherwise
    pub status: String,

    /// Per-method result: "ok" or the backend error
    pub methods: BTreeMap<String, String>,
}

/// Checks every registered method's backend.
///
/// Returns 200 when all are reachable and 503 when any is not.
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let mut healthy = true;
    let mut methods = BTreeMap::new();

    for (name, result) in state.registry.check_health().await {
        let outcome = match result {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                healthy = false;
                e.to_string()
            }
        };
        methods.insert(name, outcome);
    }

    let (status, label) =
        if healthy { (StatusCode::OK, "ok") } else { (StatusCode::SERVICE_UNAVAILABLE, "degraded") };
    (status, Json(HealthResponse { status: label.to_string(), methods }))
}

/// Heartbeat for `secret server ping`; answers 200 with a single dot.
pub async fn ping_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, ".")
}
