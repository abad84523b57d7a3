//! Error type shared by the REST handlers.

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::directory::DirectoryError;
use crate::notify::DispatchError;
use crate::session::SessionError;

/// API errors mapped to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Messaging session or provider failure.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    /// A batch could not start.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    /// User records could not be read.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    /// No messaging gateway is configured.
    #[error("Messaging gateway not configured")]
    GatewayNotConfigured,
    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Unexpected failure inside the server.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Session(SessionError::Unavailable(_))
            | ApiError::Dispatch(DispatchError::SessionUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "session_unavailable")
            }
            ApiError::Session(SessionError::SendFailed(_) | SessionError::Provider(_)) => {
                (StatusCode::BAD_GATEWAY, "provider")
            }
            ApiError::Directory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "directory"),
            ApiError::GatewayNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "gateway_not_configured")
            }
            ApiError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "error_type": error_type,
        }));

        (status, body).into_response()
    }
}
