#[cfg(feature = "rest-api")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::service::ServiceError;
use thiserror::Error;

#[cfg(feature = "rest-api")]
use serde_json::json;

/// A specialized `Result` type for REST handlers (only when the rest-api feature is enabled).
#[cfg(feature = "rest-api")]
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Every variant renders as `{"success": false, "error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request body could not be parsed.
    #[error("{0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl AppError {
    #[cfg(feature = "rest-api")]
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) | Self::Service(ServiceError::InvalidDirection(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Allows Axum to convert `AppError` into an HTTP response (only when rest-api feature enabled).
#[cfg(feature = "rest-api")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = axum::Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
