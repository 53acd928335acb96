//! Error types for the searchgate server.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use searchgate_core::GatewayError;

/// Top-level error type for the gateway application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Error raised by the search pipeline.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server is shutting down and abandoned the request.
    #[error("request canceled")]
    Canceled,
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// HTTP status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gateway(GatewayError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Gateway(GatewayError::UpstreamUnavailable { status, .. }) => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Gateway(GatewayError::BackendRejected { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Gateway(GatewayError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Gateway(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Canceled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Canceled => status.into_response(),
            // The backend's own error body goes back untouched.
            Self::Gateway(GatewayError::BackendRejected { body, .. }) => {
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            other => {
                if status.is_server_error() {
                    tracing::warn!(status = status.as_u16(), error = %other, "request failed");
                } else {
                    tracing::debug!(status = status.as_u16(), error = %other, "request rejected");
                }
                let body = serde_json::json!({
                    "error": {
                        "code": status.as_u16(),
                        "message": other.to_string(),
                        "status": status.canonical_reason().unwrap_or("Unknown"),
                    }
                });
                (status, axum::Json(body)).into_response()
            }
        }
    }
}
