//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coordinator::CoordinatorError;
use domain::ValidationError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The checkout request is malformed.
    Validation(ValidationError),
    /// Resource not found.
    NotFound(String),
    /// The request exceeded its deadline.
    DeadlineExceeded,
    /// A coordinator run failed outside the protocol.
    Coordinator(CoordinatorError),
    /// Storage failed on a read path.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::DeadlineExceeded => {
                tracing::error!("request deadline exceeded");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "request deadline exceeded".to_string(),
                )
            }
            ApiError::Coordinator(err) => {
                tracing::error!(error = %err, "checkout failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError::Coordinator(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
