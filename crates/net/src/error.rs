use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use profile_service::parser::form::FieldError;
use serde_json::json;
use tracing::error;

pub const USER_NOT_FOUND: &str = "User not found or not active.";
pub const PROFILE_EXISTS: &str = "User already has a profile.";
pub const PERMISSION_DENIED: &str = "You don't have permission to edit this profile.";
pub const UPLOAD_FAILED: &str = "Failed to upload avatar. Please try again later.";

/// Errors surfaced by the profile endpoints.
///
/// `UploadError` and `PersistenceError` carry internal detail that is logged
/// but never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {} field(s)", .0.len())]
    InvalidInput(Vec<FieldError>),
    #[error("upload error: {0}")]
    UploadError(String),
    #[error("persistence error: {0}")]
    PersistenceError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!(msg)),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg)),
            ApiError::InvalidInput(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors)),
            ApiError::UploadError(msg) => {
                error!(error = %msg, "Avatar upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!(UPLOAD_FAILED))
            }
            ApiError::PersistenceError(msg) => {
                error!(error = %msg, "Persistence error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!("Internal server error"))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::InvalidInput(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::UploadError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::PersistenceError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
