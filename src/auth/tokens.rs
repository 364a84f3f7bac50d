//! JWT issuing and verification.
//!
//! Access tokens are short-lived and carry the user's identity and role.
//! Refresh tokens are long-lived and only carry enough to look up the
//! session. Both embed the user's token version so that a global logout
//! invalidates everything issued before it.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::error::{DenticaError, Result};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID.
    pub sub: i64,
    /// User email.
    pub email: String,
    /// User role (lowercase).
    pub role: String,
    /// Token version at issue time.
    pub tver: i64,
    /// Issued-at (Unix timestamp).
    pub iat: u64,
    /// Expiration (Unix timestamp).
    pub exp: u64,
    /// Unique token ID.
    pub jti: String,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID.
    pub sub: i64,
    /// Token version at issue time.
    pub tver: i64,
    /// Expiration (Unix timestamp).
    pub exp: u64,
    /// Unique token ID.
    pub jti: String,
}

/// Issues and verifies the two token kinds from a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_expiry_secs: u64,
    refresh_expiry_days: u64,
}

impl TokenIssuer {
    /// Create a new issuer from the JWT secret and configured lifetimes.
    pub fn new(secret: &str, access_expiry_secs: u64, refresh_expiry_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            access_expiry_secs,
            refresh_expiry_days,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_expiry_secs(&self) -> u64 {
        self.access_expiry_secs
    }

    /// Issue an access token for a user.
    pub fn issue_access(&self, user: &User) -> Result<String> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            tver: user.token_version,
            iat: now,
            exp: now + self.access_expiry_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Issue a refresh token for a user.
    pub fn issue_refresh(&self, user: &User) -> Result<String> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = RefreshClaims {
            sub: user.id,
            tver: user.token_version,
            exp: now + self.refresh_expiry_days * 24 * 3600,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decode and validate an access token.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DenticaError::Token(format!("Invalid access token: {}", e)))
    }

    /// Decode and validate a refresh token.
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DenticaError::Token(format!("Invalid refresh token: {}", e)))
    }

    /// Decoding key for middleware that verifies tokens without issuing.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_expiry_secs", &self.access_expiry_secs)
            .field("refresh_expiry_days", &self.refresh_expiry_days)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountStatus, Role};

    fn sample_user() -> User {
        User {
            id: 42,
            first_name: "Ana".to_string(),
            last_name: "Gomez".to_string(),
            email: "ana@example.com".to_string(),
            password: "hash".to_string(),
            role: Role::Patient,
            status: AccountStatus::Active,
            document_type: Some("CC".to_string()),
            document_number: Some("12345678".to_string()),
            phone: None,
            address: None,
            birthdate: None,
            failed_logins: 0,
            locked_until: None,
            token_version: 3,
            created_at: "2025-01-01 00:00:00".to_string(),
            last_login: None,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = TokenIssuer::new("test-secret", 900, 7);
        let token = issuer.issue_access(&sample_user()).unwrap();
        let claims = issuer.decode_access(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role, "patient");
        assert_eq!(claims.tver, 3);
        assert_eq!(claims.exp, claims.iat + 900);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let issuer = TokenIssuer::new("test-secret", 900, 7);
        let token = issuer.issue_refresh(&sample_user()).unwrap();
        let claims = issuer.decode_refresh(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.tver, 3);
    }

    #[test]
    fn test_unique_jti_per_token() {
        let issuer = TokenIssuer::new("test-secret", 900, 7);
        let user = sample_user();
        let a = issuer.issue_access(&user).unwrap();
        let b = issuer.issue_access(&user).unwrap();
        assert_ne!(
            issuer.decode_access(&a).unwrap().jti,
            issuer.decode_access(&b).unwrap().jti
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenIssuer::new("secret-a", 900, 7);
        let other = TokenIssuer::new("secret-b", 900, 7);
        let token = issuer.issue_access(&sample_user()).unwrap();
        assert!(other.decode_access(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // jsonwebtoken's default leeway is 60 seconds, so go well past it.
        let issuer = TokenIssuer::new("test-secret", 900, 7);
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = AccessClaims {
            sub: 1,
            email: "x@example.com".to_string(),
            role: "patient".to_string(),
            tver: 1,
            iat: now - 600,
            exp: now - 300,
            jti: "test".to_string(),
        };
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();
        assert!(issuer.decode_access(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = TokenIssuer::new("test-secret", 900, 7);
        assert!(issuer.decode_access("not-a-jwt").is_err());
        assert!(issuer.decode_refresh("").is_err());
    }
}
