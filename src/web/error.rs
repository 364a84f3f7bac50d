//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    InvalidInput,
    /// Unknown account or wrong secret (401).
    InvalidCredentials,
    /// Account pending confirmation or disabled (401).
    AccountInactive,
    /// Missing, malformed, expired, or revoked token (401).
    TokenInvalid,
    /// Role mismatch (403).
    RoleMismatch,
    /// Not found (404).
    NotFound,
    /// Account temporarily locked (423).
    AccountLocked,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Internal server error (500).
    Internal,
}

impl ErrorCode {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::AccountInactive => StatusCode::UNAUTHORIZED,
            ErrorCode::TokenInvalid => StatusCode::UNAUTHORIZED,
            ErrorCode::RoleMismatch => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AccountLocked => StatusCode::LOCKED,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an invalid-token error.
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenInvalid, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => ApiError::new(ErrorCode::InvalidInput, msg),
            AuthError::InvalidCredentials => {
                ApiError::new(ErrorCode::InvalidCredentials, "Invalid email or password")
            }
            AuthError::AccountLocked => ApiError::new(
                ErrorCode::AccountLocked,
                "Account is temporarily locked, try again later",
            ),
            AuthError::AccountInactive(msg) => ApiError::new(ErrorCode::AccountInactive, msg),
            AuthError::RoleMismatch => ApiError::new(
                ErrorCode::RoleMismatch,
                "Access denied for the requested role",
            ),
            AuthError::InvalidCurrentPassword => {
                ApiError::new(ErrorCode::InvalidInput, "Current password is incorrect")
            }
            AuthError::Validation(msg) => ApiError::new(ErrorCode::InvalidInput, msg),
            AuthError::Conflict(msg) => ApiError::new(ErrorCode::InvalidInput, msg),
            AuthError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            AuthError::TokenInvalid(msg) => ApiError::new(ErrorCode::TokenInvalid, msg),
            AuthError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}
