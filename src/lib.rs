//! Dentica - authentication and account security service
//!
//! The auth backend of a dental clinic management application:
//! registration with email confirmation, login with lockout and
//! recovery codes, JWT sessions, and an append-only audit trail.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod web;

pub use auth::{
    hash_password, is_modern_hash, is_recovery_code, validate_email, validate_new_password,
    validate_registration_password, verify_password, AuthError, AuthService, LoginOutcome,
    PasswordError, RefreshOutcome, RegisterInput, TokenIssuer, ValidationError,
};
pub use config::Config;
pub use db::{AccountStatus, Database, NewUser, Role, User, UserRepository};
pub use error::{DenticaError, Result};
pub use mail::{LogMailer, Mailer};
pub use web::{build_router, WebServer};
