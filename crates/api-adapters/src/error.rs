//! HTTP rendering of service errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("invalid query parameter {name}: {reason}")]
    BadParam { name: &'static str, reason: String },

    #[error("failed to encode metrics")]
    Metrics(#[from] std::fmt::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::NotFound(..)) => StatusCode::NOT_FOUND,
            Self::Domain(DomainError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Domain(DomainError::InvalidArgument(_)) | Self::BadParam { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Domain(DomainError::Internal(_)) | Self::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Never expose storage details to callers.
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
