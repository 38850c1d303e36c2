//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not found")]
    UserNotFound,

    /// Uniform authorization failure for any operation gated on an active
    /// session. Deliberately does not distinguish "unknown id" from "id not
    /// yet activated" so callers cannot enumerate session ids.
    #[error("No user found")]
    NotAuthorized,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Verification token has expired. Please request a new login link.")]
    VerificationExpired,

    #[error("Session is already active")]
    SessionAlreadyActive,

    #[error("Session is outdated")]
    SessionOutdated,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session already inactive")]
    SessionAlreadyInactive,

    #[error("Lecture not found")]
    LectureNotFound,

    #[error("Question not found")]
    QuestionNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to send verification email: {0}")]
    Notifier(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            ApiError::NotAuthorized => (StatusCode::UNAUTHORIZED, "No user found"),
            ApiError::InvalidVerificationToken => {
                (StatusCode::BAD_REQUEST, "Invalid or expired verification token")
            }
            ApiError::VerificationExpired => (
                StatusCode::BAD_REQUEST,
                "Verification token has expired. Please request a new login link.",
            ),
            ApiError::SessionAlreadyActive => (StatusCode::CONFLICT, "Session is already active"),
            ApiError::SessionOutdated => (StatusCode::CONFLICT, "Session is outdated"),
            ApiError::SessionNotFound => (StatusCode::BAD_REQUEST, "Session not found"),
            ApiError::SessionAlreadyInactive => {
                (StatusCode::CONFLICT, "Session already inactive")
            }
            ApiError::LectureNotFound => (StatusCode::NOT_FOUND, "Lecture not found"),
            ApiError::QuestionNotFound => (StatusCode::NOT_FOUND, "Question not found"),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::Notifier(msg) => {
                tracing::error!("Failed to send verification email: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to send verification email. Please try again.",
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}
