//! Account and authentication service.
//!
//! Holds the business rules on top of the repositories: registration
//! with email confirmation, the login decision sequence, recovery codes,
//! password changes, and session lifecycle. HTTP handlers call into
//! this layer and translate [`AuthError`] into API responses.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::password::{hash_password, is_modern_hash, verify_password, PasswordError};
use crate::auth::tokens::TokenIssuer;
use crate::auth::validation::{
    is_recovery_code, validate_email, validate_new_password, validate_registration_password,
};
use crate::config::{AuthConfig, Config, MailConfig};
use crate::db::{
    format_timestamp, AccountStatus, AuditLogRepository, ConfirmationTokenRepository, Database,
    NewSession, NewUser, RecoveryTokenRepository, Role, SessionRepository, User, UserRepository,
};
use crate::error::DenticaError;
use crate::mail::Mailer;

/// Failures surfaced to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    InvalidInput(String),
    /// Unknown account or wrong secret, one message for both (401).
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// Too many failed attempts (423).
    #[error("Account is temporarily locked, try again later")]
    AccountLocked,
    /// Account not confirmed or disabled (401).
    #[error("{0}")]
    AccountInactive(String),
    /// Authenticated as a different role than requested (403).
    #[error("Access denied for the requested role")]
    RoleMismatch,
    /// Wrong current password on a password change (400).
    #[error("Current password is incorrect")]
    InvalidCurrentPassword,
    /// Field-level validation failure on registration (400).
    #[error("{0}")]
    Validation(String),
    /// Unique constraint collision on registration (400).
    #[error("{0}")]
    Conflict(String),
    /// Missing resource (404).
    #[error("{0} not found")]
    NotFound(String),
    /// Missing, malformed, expired, or revoked token (401).
    #[error("{0}")]
    TokenInvalid(String),
    /// Anything the caller should not see details of (500).
    #[error("Internal error")]
    Internal(String),
}

impl From<DenticaError> for AuthError {
    fn from(e: DenticaError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthdate: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    /// True when the user signed in with a recovery code instead of
    /// their password. The client must force a password change.
    pub token_login: bool,
    pub user: User,
}

/// Successful token refresh result.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub expires_in: u64,
}

/// Authentication and account service.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenIssuer,
    mailer: Arc<dyn Mailer>,
    auth: AuthConfig,
    mail: MailConfig,
}

impl AuthService {
    /// Create a service over an opened database.
    pub fn new(db: Database, config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenIssuer::new(
            &config.auth.jwt_secret,
            config.auth.jwt_access_token_expiry_secs,
            config.auth.jwt_refresh_token_expiry_days,
        );
        Self {
            db,
            tokens,
            mailer,
            auth: config.auth.clone(),
            mail: config.mail.clone(),
        }
    }

    /// Underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Token issuer, for middleware that verifies access tokens.
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Record an audit event. Audit failures are logged, never surfaced.
    async fn audit(&self, user_id: Option<i64>, event: &str, detail: &str, ip: Option<&str>) {
        let repo = AuditLogRepository::new(self.db.pool());
        let detail = if detail.is_empty() { None } else { Some(detail) };
        if let Err(e) = repo.record(user_id, event, detail, ip).await {
            tracing::warn!("Failed to record audit event {}: {}", event, e);
        }
    }

    /// Register a new patient account in pending state and send the
    /// confirmation link. Returns the created user.
    pub async fn register(&self, input: RegisterInput, ip: Option<&str>) -> Result<User, AuthError> {
        if input.first_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("First name is required".into()));
        }
        if input.last_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("Last name is required".into()));
        }
        validate_email(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;
        validate_registration_password(&input.password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let users = UserRepository::new(self.db.pool());
        if users.email_exists(&input.email).await? {
            self.audit(None, "REGISTER_FAILED", &format!("duplicate email {}", input.email), ip)
                .await;
            return Err(AuthError::Conflict("Email is already registered".into()));
        }
        if let Some(ref document) = input.document_number {
            if users.document_exists(document).await? {
                self.audit(None, "REGISTER_FAILED", &format!("duplicate document {}", document), ip)
                    .await;
                return Err(AuthError::Conflict("Document number is already registered".into()));
            }
        }

        let password_hash = hash_password(&input.password)?;
        let mut new_user = NewUser::new(
            input.first_name.trim(),
            input.last_name.trim(),
            input.email.as_str(),
            password_hash,
        );
        if let (Some(doc_type), Some(doc_number)) = (&input.document_type, &input.document_number) {
            new_user = new_user.with_document(doc_type, doc_number);
        }
        if let Some(ref phone) = input.phone {
            new_user = new_user.with_phone(phone);
        }
        new_user.address = input.address.clone();
        new_user.birthdate = input.birthdate.clone();

        let user = users.create(&new_user).await?;
        self.audit(Some(user.id), "REGISTER", &format!("email {}", user.email), ip).await;

        let confirmations = ConfirmationTokenRepository::new(self.db.pool());
        let token = confirmations
            .issue(user.id, self.auth.confirmation_expiry_hours)
            .await?;
        let link = format!("{}/confirmar?token={}", self.mail.frontend_url, token);
        if let Err(e) = self.mailer.send_confirmation(&user.email, &user.full_name(), &link) {
            tracing::warn!("Confirmation mail to {} failed: {}", user.email, e);
            self.audit(Some(user.id), "CONFIRMATION_EMAIL_FAILED", &e.to_string(), ip).await;
        }

        Ok(user)
    }

    /// Activate a pending account from a confirmation token.
    pub async fn confirm(&self, token: &str, ip: Option<&str>) -> Result<User, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidInput("Confirmation token is required".into()));
        }
        let confirmations = ConfirmationTokenRepository::new(self.db.pool());
        let user_id = match confirmations.consume(token).await? {
            Some(id) => id,
            None => {
                self.audit(None, "CONFIRM_FAILED", "unknown or expired token", ip).await;
                return Err(AuthError::InvalidInput(
                    "Invalid or expired confirmation token".into(),
                ));
            }
        };

        let users = UserRepository::new(self.db.pool());
        users.set_status(user_id, AccountStatus::Active).await?;
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".into()))?;
        self.audit(Some(user.id), "EMAIL_CONFIRMED", "", ip).await;
        Ok(user)
    }

    /// Authenticate a user and issue a token pair.
    ///
    /// The checks run in a fixed order: input, lookup, lockout, status,
    /// role, credential. A six-digit secret is tried as a recovery code
    /// before falling back to password verification.
    pub async fn login(
        &self,
        email: &str,
        secret: &str,
        role: Option<Role>,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        if email.trim().is_empty() || secret.is_empty() {
            return Err(AuthError::InvalidInput("Email and password are required".into()));
        }

        let users = UserRepository::new(self.db.pool());
        let user = match users.get_by_email(email).await? {
            Some(user) => user,
            None => {
                self.audit(None, "LOGIN_USER_NOT_FOUND", &format!("email {}", email), ip).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        if user.is_locked() {
            self.audit(Some(user.id), "LOGIN_ACCOUNT_LOCKED", "", ip).await;
            return Err(AuthError::AccountLocked);
        }

        match user.status {
            AccountStatus::Active => {}
            AccountStatus::Pending => {
                self.audit(Some(user.id), "LOGIN_ACCOUNT_INACTIVE", "pending confirmation", ip)
                    .await;
                return Err(AuthError::AccountInactive(
                    "Account has not been confirmed yet".into(),
                ));
            }
            AccountStatus::Inactive => {
                self.audit(Some(user.id), "LOGIN_ACCOUNT_INACTIVE", "disabled", ip).await;
                return Err(AuthError::AccountInactive("Account is disabled".into()));
            }
        }

        if let Some(requested) = role {
            if requested != user.role {
                self.audit(
                    Some(user.id),
                    "LOGIN_ROLE_MISMATCH",
                    &format!("requested {}, actual {}", requested, user.role),
                    ip,
                )
                .await;
                return Err(AuthError::RoleMismatch);
            }
        }

        let mut token_login = false;
        let mut verified = false;
        if is_recovery_code(secret) {
            let recovery = RecoveryTokenRepository::new(self.db.pool());
            if recovery.consume(user.id, secret).await? {
                token_login = true;
                verified = true;
            }
        }
        if !verified {
            verified = verify_password(secret, &user.password);
            if verified && !is_modern_hash(&user.password) {
                self.migrate_legacy_password(&user, secret, ip).await;
            }
        }

        if !verified {
            let count = users.record_failed_login(user.id).await?;
            let locked = count >= self.auth.max_failed_logins;
            if locked {
                let until = format_timestamp(Utc::now() + Duration::minutes(self.auth.lockout_minutes));
                users.lock_until(user.id, &until).await?;
            }
            self.audit(
                Some(user.id),
                "LOGIN_FAILED_PASSWORD",
                &format!("attempt {}, locked {}", count, locked),
                ip,
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        users.record_successful_login(user.id).await?;
        self.audit(Some(user.id), "LOGIN_SUCCESS", "", ip).await;

        // Reload so the returned user reflects the cleared counters.
        let user = users
            .get_by_id(user.id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".into()))?;

        let (access_token, refresh_token) = self.issue_session(&user, ip, user_agent).await?;
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_expiry_secs(),
            token_login,
            user,
        })
    }

    /// Re-hash a legacy plaintext password after a successful login.
    /// Best-effort: the login succeeds even if persisting fails.
    async fn migrate_legacy_password(&self, user: &User, plain: &str, ip: Option<&str>) {
        let users = UserRepository::new(self.db.pool());
        match hash_password(plain) {
            Ok(hash) => match users.set_password(user.id, &hash).await {
                Ok(()) => {
                    self.audit(Some(user.id), "PASSWORD_MIGRATED", "", ip).await;
                }
                Err(e) => {
                    tracing::warn!("Legacy password migration for user {} failed: {}", user.id, e);
                }
            },
            Err(e) => {
                tracing::warn!("Legacy password re-hash for user {} failed: {}", user.id, e);
            }
        }
    }

    /// Mint an access/refresh pair and persist the session row.
    async fn issue_session(
        &self,
        user: &User,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(String, String), AuthError> {
        let access_token = self.tokens.issue_access(user)?;
        let refresh_token = self.tokens.issue_refresh(user)?;
        let expires_at = format_timestamp(
            Utc::now() + Duration::days(self.auth.jwt_refresh_token_expiry_days as i64),
        );
        let sessions = SessionRepository::new(self.db.pool());
        sessions
            .create(&NewSession {
                user_id: user.id,
                refresh_token: refresh_token.clone(),
                token_version: user.token_version,
                expires_at,
                ip: ip.map(str::to_string),
                user_agent: user_agent.map(str::to_string),
            })
            .await?;
        Ok((access_token, refresh_token))
    }

    /// Issue a recovery code for a user identified by email plus
    /// document number and mail it. A mismatch is reported explicitly.
    pub async fn recover(
        &self,
        email: &str,
        document_number: &str,
        ip: Option<&str>,
    ) -> Result<(), AuthError> {
        if email.trim().is_empty() || document_number.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and document number are required".into(),
            ));
        }

        let users = UserRepository::new(self.db.pool());
        let user = users
            .get_by_email_and_document(email, document_number)
            .await?
            .ok_or_else(|| {
                AuthError::InvalidInput("The provided data does not match any account".into())
            })?;

        let recovery = RecoveryTokenRepository::new(self.db.pool());
        let code = recovery.issue(user.id, self.auth.recovery_expiry_minutes).await?;
        self.audit(Some(user.id), "RECOVERY_REQUESTED", "", ip).await;

        if let Err(e) = self.mailer.send_recovery(&user.email, &user.full_name(), &code) {
            tracing::warn!("Recovery mail to {} failed: {}", user.email, e);
            self.audit(Some(user.id), "RECOVERY_EMAIL_FAILED", &e.to_string(), ip).await;
        }
        Ok(())
    }

    /// Change a password. The user id comes from the verified access
    /// token, never from the request body.
    pub async fn change_password(
        &self,
        user_id: i64,
        current: &str,
        new: &str,
        ip: Option<&str>,
    ) -> Result<(), AuthError> {
        validate_new_password(new).map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let users = UserRepository::new(self.db.pool());
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".into()))?;

        if !verify_password(current, &user.password) {
            return Err(AuthError::InvalidCurrentPassword);
        }

        let hash = hash_password(new)?;
        users.set_password(user.id, &hash).await?;
        self.audit(Some(user.id), "PASSWORD_CHANGED", "", ip).await;
        Ok(())
    }

    /// Exchange a valid refresh token for a new access token. The
    /// refresh token is not rotated.
    pub async fn refresh(&self, refresh_token: &str, ip: Option<&str>) -> Result<RefreshOutcome, AuthError> {
        let claims = match self.tokens.decode_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                self.audit(None, "REFRESH_TOKEN_REJECTED", "invalid token", ip).await;
                return Err(AuthError::TokenInvalid(e.to_string()));
            }
        };

        let sessions = SessionRepository::new(self.db.pool());
        if sessions.get_valid(refresh_token).await?.is_none() {
            self.audit(Some(claims.sub), "REFRESH_TOKEN_REJECTED", "no active session", ip).await;
            return Err(AuthError::TokenInvalid("Session expired or revoked".into()));
        }

        let users = UserRepository::new(self.db.pool());
        let user = match users.get_by_id(claims.sub).await? {
            Some(user) => user,
            None => {
                self.audit(Some(claims.sub), "REFRESH_TOKEN_REJECTED", "user gone", ip).await;
                return Err(AuthError::TokenInvalid("Invalid refresh token".into()));
            }
        };
        if claims.tver != user.token_version {
            self.audit(Some(user.id), "REFRESH_TOKEN_REJECTED", "token version mismatch", ip)
                .await;
            return Err(AuthError::TokenInvalid("Token has been invalidated".into()));
        }

        let access_token = self.tokens.issue_access(&user)?;
        self.audit(Some(user.id), "REFRESH_TOKEN_SUCCESS", "", ip).await;
        Ok(RefreshOutcome {
            access_token,
            expires_in: self.tokens.access_expiry_secs(),
        })
    }

    /// Revoke one session. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str, ip: Option<&str>) -> Result<(), AuthError> {
        let user_id = self.tokens.decode_refresh(refresh_token).ok().map(|c| c.sub);
        let sessions = SessionRepository::new(self.db.pool());
        let removed = sessions.delete(refresh_token).await?;
        if removed {
            self.audit(user_id, "LOGOUT", "", ip).await;
        }
        Ok(())
    }

    /// Revoke every session for the user and invalidate all previously
    /// issued tokens via the token version.
    pub async fn logout_all(&self, user_id: i64, ip: Option<&str>) -> Result<(), AuthError> {
        let sessions = SessionRepository::new(self.db.pool());
        let removed = sessions.delete_all_for_user(user_id).await?;
        let users = UserRepository::new(self.db.pool());
        users.increment_token_version(user_id).await?;
        self.audit(Some(user_id), "LOGOUT_ALL_SESSIONS", &format!("{} sessions", removed), ip)
            .await;
        Ok(())
    }

    /// Load a user by id, for the authenticated profile endpoint.
    pub async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        let users = UserRepository::new(self.db.pool());
        users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".into()))
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("db", &self.db).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::LogMailer;

    async fn setup() -> AuthService {
        let db = Database::open_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        AuthService::new(db, &config, Arc::new(LogMailer))
    }

    fn sample_input() -> RegisterInput {
        RegisterInput {
            first_name: "Ana".to_string(),
            last_name: "Gomez".to_string(),
            email: "Ana@Example.com".to_string(),
            password: "Str0ngPass".to_string(),
            document_type: Some("CC".to_string()),
            document_number: Some("12345678".to_string()),
            phone: Some("555-0100".to_string()),
            address: None,
            birthdate: None,
        }
    }

    async fn registered_active_user(service: &AuthService) -> User {
        let user = service.register(sample_input(), None).await.unwrap();
        let users = UserRepository::new(service.db.pool());
        users.set_status(user.id, AccountStatus::Active).await.unwrap();
        users.get_by_id(user.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_pending_patient() {
        let service = setup().await;
        let user = service.register(sample_input(), None).await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, Role::Patient);
        assert_eq!(user.status, AccountStatus::Pending);
        assert!(is_modern_hash(&user.password));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let service = setup().await;
        service.register(sample_input(), None).await.unwrap();
        let mut dup = sample_input();
        dup.document_number = Some("999".to_string());
        let err = service.register(dup, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_weak_password_rejected() {
        let service = setup().await;
        let mut input = sample_input();
        input.password = "alllowercase1".to_string();
        let err = service.register(input, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_confirm_activates_account() {
        let service = setup().await;
        let user = service.register(sample_input(), None).await.unwrap();
        let token = ConfirmationTokenRepository::new(service.db.pool())
            .issue(user.id, 24)
            .await
            .unwrap();
        let confirmed = service.confirm(&token, None).await.unwrap();
        assert_eq!(confirmed.status, AccountStatus::Active);
        // Single use.
        assert!(service.confirm(&token, None).await.is_err());
    }

    #[tokio::test]
    async fn test_login_pending_account_rejected() {
        let service = setup().await;
        service.register(sample_input(), None).await.unwrap();
        let err = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive(_)));
    }

    #[tokio::test]
    async fn test_login_success_returns_tokens() {
        let service = setup().await;
        registered_active_user(&service).await;
        let outcome = service
            .login("ANA@example.com", "Str0ngPass", None, None, Some("test-agent"))
            .await
            .unwrap();
        assert!(!outcome.access_token.is_empty());
        assert!(!outcome.refresh_token.is_empty());
        assert!(!outcome.token_login);
        assert_eq!(outcome.user.failed_logins, 0);
        assert!(outcome.user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_unknown_and_wrong_password_identical() {
        let service = setup().await;
        registered_active_user(&service).await;
        let unknown = service
            .login("nobody@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap_err();
        let wrong = service
            .login("ana@example.com", "WrongPass1", None, None, None)
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_role_mismatch_rejected() {
        let service = setup().await;
        registered_active_user(&service).await;
        let err = service
            .login("ana@example.com", "Str0ngPass", Some(Role::Admin), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RoleMismatch));
    }

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let service = setup().await;
        registered_active_user(&service).await;
        for _ in 0..4 {
            let err = service
                .login("ana@example.com", "WrongPass1", None, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        // Fifth failure trips the lock.
        let err = service
            .login("ana@example.com", "WrongPass1", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        // Correct password is still refused while locked.
        let err = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
    }

    #[tokio::test]
    async fn test_legacy_password_migrated_on_login() {
        let service = setup().await;
        let user = registered_active_user(&service).await;
        let users = UserRepository::new(service.db.pool());
        users.set_password(user.id, "plaintext-secret").await.unwrap();

        let outcome = service
            .login("ana@example.com", "plaintext-secret", None, None, None)
            .await
            .unwrap();
        assert!(is_modern_hash(&outcome.user.password));
        // The migrated hash still verifies.
        service
            .login("ana@example.com", "plaintext-secret", None, None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recovery_code_login_is_single_use() {
        let service = setup().await;
        let user = registered_active_user(&service).await;
        service.recover("ana@example.com", "12345678", None).await.unwrap();
        let code = RecoveryTokenRepository::new(service.db.pool())
            .get_for_user(user.id)
            .await
            .unwrap()
            .unwrap()
            .code;

        let outcome = service
            .login("ana@example.com", &code, None, None, None)
            .await
            .unwrap();
        assert!(outcome.token_login);

        let err = service
            .login("ana@example.com", &code, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_recover_mismatch_is_explicit() {
        let service = setup().await;
        registered_active_user(&service).await;
        let err = service.recover("ana@example.com", "00000000", None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let service = setup().await;
        let user = registered_active_user(&service).await;
        let err = service
            .change_password(user.id, "WrongPass1", "newpass", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCurrentPassword));

        service
            .change_password(user.id, "Str0ngPass", "newpass", None)
            .await
            .unwrap();
        service.login("ana@example.com", "newpass", None, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_change_password_rejects_short_new() {
        let service = setup().await;
        let user = registered_active_user(&service).await;
        let err = service
            .change_password(user.id, "Str0ngPass", "short", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let service = setup().await;
        registered_active_user(&service).await;
        let outcome = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap();
        let refreshed = service.refresh(&outcome.refresh_token, None).await.unwrap();
        assert!(!refreshed.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rejected_after_logout() {
        let service = setup().await;
        registered_active_user(&service).await;
        let outcome = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap();
        service.logout(&outcome.refresh_token, None).await.unwrap();
        let err = service.refresh(&outcome.refresh_token, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[tokio::test]
    async fn test_logout_all_invalidates_existing_refresh_tokens() {
        let service = setup().await;
        let user = registered_active_user(&service).await;
        let first = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap();
        let second = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap();

        service.logout_all(user.id, None).await.unwrap();
        assert!(service.refresh(&first.refresh_token, None).await.is_err());
        assert!(service.refresh(&second.refresh_token, None).await.is_err());

        // A fresh login works and carries the bumped version.
        let third = service
            .login("ana@example.com", "Str0ngPass", None, None, None)
            .await
            .unwrap();
        assert_eq!(third.user.token_version, user.token_version + 1);
        service.refresh(&third.refresh_token, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_audits_events() {
        let service = setup().await;
        registered_active_user(&service).await;
        service
            .login("ana@example.com", "Str0ngPass", None, Some("10.0.0.1"), None)
            .await
            .unwrap();
        let entries = AuditLogRepository::new(service.db.pool()).recent(10).await.unwrap();
        assert!(entries.iter().any(|e| e.event == "LOGIN_SUCCESS"));
        assert!(entries.iter().any(|e| e.event == "REGISTER"));
    }
}
