//! Request-path error responses
//!
//! Pool mechanics never surface here: selection exhaustion degrades inside
//! the resolver and probe failures stay in the pool core. What reaches the
//! caller is the final backend outcome or a malformed-request rejection.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use backend::BackendError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            // Upstream status codes pass through so callers see the
            // vendor's own error semantics
            ApiError::Backend(BackendError::Upstream { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Backend(BackendError::Transport(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Backend(BackendError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": { "message": self.to_string() }
        });
        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
