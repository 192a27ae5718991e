//! Get and set secrets by key.
//!
//! The passphrase travels in the `cipher` header; a missing header means
//! an empty passphrase. The storage method comes from the `method` query
//! parameter (GET) or body field (POST).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::dispatch::DispatchError;

/// Header carrying the caller's passphrase
pub const CIPHER_HEADER: &str = "cipher";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetByKeyQuery {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueResponse {
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetByKeyRequest {
    #[serde(default)]
    pub getter: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub value: String,
}

fn passphrase(headers: &HeaderMap) -> &[u8] {
    headers.get(CIPHER_HEADER).map(|value| value.as_bytes()).unwrap_or_default()
}

#[instrument(skip_all)]
pub async fn get_by_key_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<GetByKeyQuery>,
) -> Result<Json<ValueResponse>, ApiError> {
    if query.key.is_empty() {
        return Err(DispatchError::MissingKeyParam.into());
    }
    debug!(method = %query.method, key_len = query.key.len(), "Reading secret");

    let lease = state.registry.lease(&query.method, passphrase(&headers)).await?;
    let value = lease.require_data(query.key.as_bytes()).await?;

    let value = String::from_utf8(value)
        .map_err(|_| ApiError::Internal("stored value is not valid UTF-8".to_string()))?;
    Ok(Json(ValueResponse { value }))
}

#[instrument(skip_all)]
pub async fn set_by_key_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    // serde_json messages can quote input, so only the position is reported.
    let request: SetByKeyRequest = serde_json::from_slice(&body).map_err(|e| {
        ApiError::BadRequest(format!(
            "cannot decode request body: malformed JSON at line {} column {}",
            e.line(),
            e.column()
        ))
    })?;

    if request.getter.is_empty() {
        return Err(DispatchError::MissingKeyParam.into());
    }
    debug!(
        method = %request.method,
        key_len = request.getter.len(),
        value_len = request.value.len(),
        "Writing secret"
    );

    let lease = state.registry.lease(&request.method, passphrase(&headers)).await?;
    lease.set_data(request.getter.as_bytes(), request.value.as_bytes()).await?;

    Ok(StatusCode::NO_CONTENT)
}
