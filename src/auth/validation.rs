//! Input validation for dentica registration and login.
//!
//! This module provides validation functions for emails, passwords
//! and recovery codes.

use thiserror::Error;

/// Minimum password length at registration.
pub const MIN_REGISTRATION_PASSWORD_LENGTH: usize = 8;

/// Minimum password length when changing an existing password.
pub const MIN_CHANGE_PASSWORD_LENGTH: usize = 6;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Number of digits in a recovery code.
pub const RECOVERY_CODE_LENGTH: usize = 6;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is missing or blank.
    #[error("{0} is required")]
    FieldRequired(&'static str),

    /// Password is too short.
    #[error("password must be at least {MIN_REGISTRATION_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// Password lacks a required character class.
    #[error("password must contain uppercase, lowercase and a non-digit character")]
    PasswordTooWeak,

    /// New password is too short.
    #[error("new password must be at least {MIN_CHANGE_PASSWORD_LENGTH} characters")]
    NewPasswordTooShort,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,
}

/// Validate an email address.
///
/// Basic format check: one @ with non-empty local part and a dotted
/// domain. Intentionally simple; deliverability is proven by the
/// confirmation mail.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::FieldRequired("email"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(ValidationError::EmailInvalidFormat);
    }

    // Domain must contain a dot with text on both sides
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate a registration password.
///
/// Requirements:
/// - Length: 8-128 characters
/// - At least one uppercase, one lowercase and one non-digit character
pub fn validate_registration_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_REGISTRATION_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_non_digit = password.chars().any(|c| !c.is_ascii_digit());
    if !has_upper || !has_lower || !has_non_digit {
        return Err(ValidationError::PasswordTooWeak);
    }

    Ok(())
}

/// Validate a replacement password from the change-password flow.
///
/// Looser than registration: at least 6 characters.
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_CHANGE_PASSWORD_LENGTH {
        return Err(ValidationError::NewPasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Check whether a login secret has the shape of a recovery code
/// (exactly 6 ASCII digits).
pub fn is_recovery_code(secret: &str) -> bool {
    secret.len() == RECOVERY_CODE_LENGTH && secret.chars().all(|c| c.is_ascii_digit())
}
