//! Error types for dentica.

use thiserror::Error;

/// Common error type for dentica.
#[derive(Error, Debug)]
pub enum DenticaError {
    /// Database error.
    ///
    /// This is a generic database error that wraps errors from any database backend.
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Token encoding or decoding error.
    #[error("token error: {0}")]
    Token(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for DenticaError {
    fn from(e: sqlx::Error) -> Self {
        DenticaError::Database(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for DenticaError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        DenticaError::Token(e.to_string())
    }
}

/// Result type alias for dentica operations.
pub type Result<T> = std::result::Result<T, DenticaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = DenticaError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_validation_error_display() {
        let err = DenticaError::Validation("email already taken".to_string());
        assert_eq!(err.to_string(), "validation error: email already taken");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = DenticaError::NotFound("user".to_string());
        assert_eq!(err.to_string(), "user not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DenticaError = io_err.into();
        assert!(matches!(err, DenticaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(DenticaError::Auth("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
