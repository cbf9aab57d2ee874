//! Upload server errors and the failure envelope.

use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Shown instead of internal details outside development mode.
const HIDDEN_DETAIL: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, please try again later.")]
    RateLimited,

    /// `detail` is already redacted when the server is not in development mode.
    #[error("{message}: {detail}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn song_not_found() -> Self {
        Self::NotFound("Song not found".to_string())
    }

    /// Log `cause` and wrap it, keeping the text only in development.
    pub fn internal(message: &'static str, cause: impl std::fmt::Display, development: bool) -> Self {
        tracing::error!(target: "server", error = %cause, "{message}");
        Self::Internal {
            message,
            detail: if development {
                cause.to_string()
            } else {
                HIDDEN_DETAIL.to_string()
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, error) = match self {
            ApiError::Internal { message, detail } => (message.to_string(), detail),
            other => (
                other.to_string(),
                status.canonical_reason().unwrap_or("Error").to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "error": error,
        }));

        (status, body).into_response()
    }
}

/// Turns a handler panic into the generic 500 envelope.
pub fn panic_response(
    development: bool,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        ApiError::internal(HIDDEN_DETAIL, format!("handler panicked: {detail}"), development)
            .into_response()
    }
}

/// Unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
