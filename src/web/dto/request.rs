//! Request DTOs for the API.

use serde::Deserialize;

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Identity document type (optional).
    #[serde(default)]
    pub document_type: Option<String>,
    /// Identity document number (optional).
    #[serde(default)]
    pub document_number: Option<String>,
    /// Phone number (optional).
    #[serde(default)]
    pub phone: Option<String>,
    /// Postal address (optional).
    #[serde(default)]
    pub address: Option<String>,
    /// Birthdate (optional).
    #[serde(default)]
    pub birthdate: Option<String>,
}

/// Login request. The password field also accepts a 6-digit recovery
/// code.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password or recovery code.
    pub password: String,
    /// Expected role; login fails if the account's role differs.
    #[serde(default)]
    pub role: Option<String>,
}

/// Confirmation query string (`?token=`).
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    /// Confirmation token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Password recovery request.
#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    /// Email address.
    pub email: String,
    /// Identity document number as a secondary check.
    pub document_number: String,
}

/// Password change request.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub current_password: String,
    /// New password.
    pub new_password: String,
}

/// Token refresh request. The token may come from the body or the
/// refresh cookie.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Logout request.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke.
    #[serde(default)]
    pub refresh_token: Option<String>,
}
