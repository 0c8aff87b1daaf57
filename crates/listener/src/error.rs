//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feed::{QueryError, RejectionReason, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is not JSON at all.
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    /// The normaliser refused the payload.
    #[error(transparent)]
    Rejected(RejectionReason),

    /// A query parameter was unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The event store failed.
    #[error(transparent)]
    Store(StoreError),
}

impl ApiError {
    /// Returns the HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(RejectionReason::UnsupportedEventType { .. }) => StatusCode::BAD_REQUEST,
            Self::Rejected(RejectionReason::MalformedPayload { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            // Ignored actions are answered by the webhook handler itself; this
            // arm only exists for completeness.
            Self::Rejected(RejectionReason::IgnoredAction { .. }) => StatusCode::ACCEPTED,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Store(err) if err.retry_policy().is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "MALFORMED_PAYLOAD",
            Self::Rejected(reason) => reason.code(),
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Store(StoreError::Unavailable { .. }) => "STORE_UNAVAILABLE",
            Self::Store(StoreError::Corrupt { .. }) => "STORE_CORRUPT",
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidArgument { message } => Self::InvalidArgument(message),
            QueryError::Store(err) => Self::Store(err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
