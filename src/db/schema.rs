//! Database schema and migrations for dentica.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Initial schema - users table
    r#"
-- Users table for authentication and account management
CREATE TABLE users (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    email            TEXT NOT NULL UNIQUE,     -- stored lowercase
    password         TEXT NOT NULL,            -- Argon2 PHC string (legacy rows: plaintext)
    role             TEXT NOT NULL DEFAULT 'patient',   -- 'patient', 'dentist', 'admin'
    status           TEXT NOT NULL DEFAULT 'pending',   -- 'pending', 'active', 'inactive'
    document_type    TEXT,
    document_number  TEXT UNIQUE,
    phone            TEXT,
    address          TEXT,
    birthdate        TEXT,
    failed_logins    INTEGER NOT NULL DEFAULT 0,
    locked_until     TEXT,
    token_version    INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL DEFAULT (datetime('now')),
    last_login       TEXT
);

CREATE INDEX idx_users_email ON users(email);
CREATE INDEX idx_users_role ON users(role);
"#,
    // v2: Recovery and confirmation tokens
    r#"
-- Recovery codes for password-less account recovery (single use, 1 hour)
CREATE TABLE recovery_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    code        TEXT NOT NULL,                 -- exactly 6 digits, zero-padded
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_recovery_tokens_user_id ON recovery_tokens(user_id);

-- Email confirmation tokens for account activation (single use, 24 hours)
CREATE TABLE confirmation_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,          -- 64 hex chars
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_confirmation_tokens_user_id ON confirmation_tokens(user_id);
"#,
    // v3: Sessions and audit log
    r#"
-- Refresh token sessions (one row per issued refresh token)
CREATE TABLE sessions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    refresh_token  TEXT NOT NULL UNIQUE,
    token_version  INTEGER NOT NULL,           -- user's token_version at issuance
    expires_at     TEXT NOT NULL,
    ip             TEXT,
    user_agent     TEXT,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_sessions_user_id ON sessions(user_id);

-- Append-only security audit trail
CREATE TABLE audit_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
    event       TEXT NOT NULL,
    detail      TEXT,
    ip          TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_audit_log_user_id ON audit_log(user_id);
CREATE INDEX idx_audit_log_event ON audit_log(event);
"#,
];
