//! User model and repository for dentica.
//!
//! This module defines the User entity, the Role and AccountStatus
//! enums, and the repository with the account-security operations
//! (lockout counters, token versions, activation).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{now_timestamp, parse_timestamp, DbPool};
use crate::{DenticaError, Result};

/// User role within the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Patient (default for self-registration).
    #[default]
    Patient,
    /// Dentist (clinic staff).
    Dentist,
    /// Administrator.
    Admin,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Dentist => "dentist",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "dentist" => Ok(Role::Dentist),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered but email not yet confirmed.
    #[default]
    Pending,
    /// Active account.
    Active,
    /// Deactivated account.
    Inactive,
}

impl AccountStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AccountStatus::Pending),
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            _ => Err(format!("unknown account status: {s}")),
        }
    }
}

impl TryFrom<String> for AccountStatus {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// User entity representing a registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address (unique, stored lowercase).
    pub email: String,
    /// Password hash (Argon2 PHC string; legacy rows hold plaintext).
    pub password: String,
    /// User role.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Account status.
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    /// Identity document type (optional).
    pub document_type: Option<String>,
    /// Identity document number (unique, optional).
    pub document_number: Option<String>,
    /// Phone number (optional).
    pub phone: Option<String>,
    /// Postal address (optional).
    pub address: Option<String>,
    /// Birthdate (optional).
    pub birthdate: Option<String>,
    /// Consecutive failed login attempts.
    pub failed_logins: i64,
    /// Lockout expiry timestamp (None if not locked).
    pub locked_until: Option<String>,
    /// Token version for global session invalidation.
    pub token_version: i64,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last successful login timestamp.
    pub last_login: Option<String>,
}

impl User {
    /// Check if the account is currently locked out.
    pub fn is_locked(&self) -> bool {
        match self.locked_until.as_deref().and_then(parse_timestamp) {
            Some(until) => until > chrono::Utc::now(),
            None => false,
        }
    }

    /// Full display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address (will be stored lowercase).
    pub email: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// User role (defaults to Patient).
    pub role: Role,
    /// Account status (defaults to Pending).
    pub status: AccountStatus,
    /// Identity document type.
    pub document_type: Option<String>,
    /// Identity document number.
    pub document_number: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Birthdate.
    pub birthdate: Option<String>,
}

impl NewUser {
    /// Create a new user with minimal required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::Patient,
            status: AccountStatus::Pending,
            document_type: None,
            document_number: None,
            phone: None,
            address: None,
            birthdate: None,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the account status.
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the identity document.
    pub fn with_document(
        mut self,
        document_type: impl Into<String>,
        document_number: impl Into<String>,
    ) -> Self {
        self.document_type = Some(document_type.into());
        self.document_number = Some(document_number.into());
        self
    }

    /// Set the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password, role, status, \
     document_type, document_number, phone, address, birthdate, \
     failed_logins, locked_until, token_version, created_at, last_login";

/// Repository for user persistence and account-security state.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// The email is lowercased before storage. Returns the created
    /// user with the assigned ID.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, email, password, role, status,
                                document_type, document_number, phone, address, birthdate)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
        )
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.email.to_lowercase())
        .bind(&new_user.password)
        .bind(new_user.role.as_str())
        .bind(new_user.status.as_str())
        .bind(&new_user.document_type)
        .bind(&new_user.document_number)
        .bind(&new_user.phone)
        .bind(&new_user.address)
        .bind(&new_user.birthdate)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DenticaError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive; input is lowercased).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.to_lowercase())
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email and document number, for recovery identity checks.
    pub async fn get_by_email_and_document(
        &self,
        email: &str,
        document_number: &str,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND document_number = $2"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.to_lowercase())
            .bind(document_number)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Check if an email is already taken (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email.to_lowercase())
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Check if a document number is already registered.
    pub async fn document_exists(&self, document_number: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE document_number = $1)")
                .bind(document_number)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Atomically increment the failed login counter.
    ///
    /// Returns the new counter value. One statement so concurrent
    /// failures each observe a distinct count.
    pub async fn record_failed_login(&self, id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "UPDATE users SET failed_logins = failed_logins + 1
             WHERE id = $1 RETURNING failed_logins",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Lock the account until the given timestamp and reset the counter.
    pub async fn lock_until(&self, id: i64, until: &str) -> Result<()> {
        sqlx::query("UPDATE users SET locked_until = $1, failed_logins = 0 WHERE id = $2")
            .bind(until)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Reset lockout state and stamp last_login after a successful login.
    pub async fn record_successful_login(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE users SET failed_logins = 0, locked_until = NULL, last_login = $1
             WHERE id = $2",
        )
        .bind(now_timestamp())
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Replace the stored password hash.
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Change the account status.
    pub async fn set_status(&self, id: i64, status: AccountStatus) -> Result<()> {
        sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Increment the token version, invalidating all outstanding tokens.
    ///
    /// Returns the new version.
    pub async fn increment_token_version(&self, id: i64) -> Result<i64> {
        let version: i64 = sqlx::query_scalar(
            "UPDATE users SET token_version = token_version + 1
             WHERE id = $1 RETURNING token_version",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(version)
    }

    /// Get the current token version for a user.
    pub async fn token_version(&self, id: i64) -> Result<Option<i64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT token_version FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(version)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
