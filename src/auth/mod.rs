//! Authentication: password hashing, input validation, JWT issuing,
//! and the account service tying them together.

pub mod password;
pub mod service;
pub mod tokens;
pub mod validation;

pub use password::{hash_password, is_modern_hash, verify_password, PasswordError};
pub use service::{AuthError, AuthService, LoginOutcome, RefreshOutcome, RegisterInput};
pub use tokens::{AccessClaims, RefreshClaims, TokenIssuer};
pub use validation::{
    is_recovery_code, validate_email, validate_new_password, validate_registration_password,
    ValidationError,
};
