use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::dispatch::DispatchError;
use crate::provider::ProviderError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        }
    }
}

/// Body of every error response: `{"error": "<message>"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownMethod { .. } | DispatchError::MissingKeyParam => {
                ApiError::BadRequest(err.to_string())
            }
            DispatchError::Backend(_) => {
                error!(error = %err, "Backend unavailable");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        if err.is_invalid_key() {
            return ApiError::BadRequest(err.to_string());
        }
        if err.is_not_found() {
            debug!(stage = %err.stage(), "Secret not found");
        } else if err.is_authentication_failure() {
            warn!(stage = %err.stage(), "Secret could not be authenticated");
        } else {
            error!(stage = %err.stage(), error = %err, "Provider operation failed");
        }
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::storage::{StorageError, StoreKind};

    #[test]
    fn test_dispatch_errors_are_bad_requests() {
        let err: ApiError = DispatchError::unknown_method("cloud").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = DispatchError::MissingKeyParam.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_acquisition_failure_is_internal() {
        let err: ApiError =
            DispatchError::Backend(StorageError::connection_failure(StoreKind::Redis, "refused"))
                .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_provider_error_mapping() {
        let err: ApiError = ProviderError::Read(StorageError::NotFound).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "cannot read data: secret not found");

        let err: ApiError = ProviderError::Save(StorageError::InvalidKey).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = ProviderError::Decode(CryptoError::AuthenticationFailure).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.message(),
            "cannot decode data: authentication failed - wrong passphrase or tampered ciphertext"
        );
    }
}
