//! Email confirmation token repository.
//!
//! Confirmation tokens are long random hex strings mailed to a newly
//! registered user; visiting the confirmation link consumes the token
//! and activates the account.

use rand::rngs::OsRng;
use rand::RngCore;

use super::{format_timestamp, DbPool};
use crate::Result;

const SQL_NOW: &str = "datetime('now')";

/// Confirmation token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfirmationToken {
    /// Token ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// 64-char hex token.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Generate a 64-char hex token from 32 random bytes.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Repository for confirmation token operations.
pub struct ConfirmationTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ConfirmationTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Issue a confirmation token for a user, valid for `expiry_hours`.
    ///
    /// Previous tokens for the user are replaced.
    pub async fn issue(&self, user_id: i64, expiry_hours: i64) -> Result<String> {
        let token = generate_token();
        let expires_at =
            format_timestamp(chrono::Utc::now() + chrono::Duration::hours(expiry_hours));

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM confirmation_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO confirmation_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(&expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(token)
    }

    /// Consume a confirmation token.
    ///
    /// Returns the owning user's id if the token existed and was not
    /// expired. Single atomic DELETE .. RETURNING.
    pub async fn consume(&self, token: &str) -> Result<Option<i64>> {
        let sql = format!(
            "DELETE FROM confirmation_tokens
             WHERE token = $1 AND expires_at > {SQL_NOW}
             RETURNING user_id"
        );
        let user_id: Option<i64> = sqlx::query_scalar(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;

        Ok(user_id)
    }

    /// Delete expired tokens (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!("DELETE FROM confirmation_tokens WHERE expires_at <= {SQL_NOW}");
        let result = sqlx::query(&sql).execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}
