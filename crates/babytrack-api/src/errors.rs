use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use babytrack_core::CoreError;

/// API error types with JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token.
    Unauthorized(String),
    /// Invalid path, query or body.
    BadRequest(String),
    /// Resource not found (or not owned by the caller).
    NotFound(String),
    /// Write collided with an existing record.
    Conflict(String),
    /// Internal server error.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApiError::NotFound(format!("{msg} not found")),
            CoreError::Conflict(msg) => ApiError::Conflict(format!("{msg} already exists")),
            CoreError::Validation(e) => ApiError::BadRequest(e.to_string()),
            CoreError::Id(e) => ApiError::BadRequest(e.to_string()),
            other => {
                tracing::error!("Core error: {other}");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
