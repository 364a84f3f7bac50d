//! Recovery token repository.
//!
//! Recovery tokens are short numeric codes mailed to the user as a
//! one-shot login secret. A user has at most one live code: issuing a
//! new one supersedes any previous code, and consumption is a single
//! atomic statement so a code can never be used twice.

use rand::rngs::OsRng;
use rand::Rng;

use super::{format_timestamp, DbPool};
use crate::Result;

const SQL_NOW: &str = "datetime('now')";

/// Number of digits in a recovery code.
const RECOVERY_CODE_DIGITS: u32 = 6;

/// Recovery token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecoveryToken {
    /// Token ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Six-digit zero-padded code.
    pub code: String,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Generate a uniformly random zero-padded recovery code.
fn generate_code() -> String {
    let max = 10u32.pow(RECOVERY_CODE_DIGITS);
    let n = OsRng.gen_range(0..max);
    format!("{:06}", n)
}

/// Repository for recovery token operations.
pub struct RecoveryTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RecoveryTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Issue a fresh recovery code for a user.
    ///
    /// In one transaction, deletes the user's previous codes and any
    /// expired codes left over from other users, then inserts a new
    /// random code valid for `expiry_minutes`. Returns the code.
    pub async fn issue(&self, user_id: i64, expiry_minutes: i64) -> Result<String> {
        let code = generate_code();
        let expires_at =
            format_timestamp(chrono::Utc::now() + chrono::Duration::minutes(expiry_minutes));

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recovery_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let cleanup = format!("DELETE FROM recovery_tokens WHERE expires_at <= {SQL_NOW}");
        sqlx::query(&cleanup).execute(&mut *tx).await?;

        sqlx::query("INSERT INTO recovery_tokens (user_id, code, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(&code)
            .bind(&expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(code)
    }

    /// Consume a recovery code.
    ///
    /// One DELETE .. RETURNING statement: true iff an unexpired code
    /// matching the user was deleted. Concurrent attempts with the
    /// same code see at most one success.
    pub async fn consume(&self, user_id: i64, code: &str) -> Result<bool> {
        let sql = format!(
            "DELETE FROM recovery_tokens
             WHERE user_id = $1 AND code = $2 AND expires_at > {SQL_NOW}
             RETURNING id"
        );
        let deleted: Option<i64> = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        Ok(deleted.is_some())
    }

    /// Get the live token for a user, if any.
    pub async fn get_for_user(&self, user_id: i64) -> Result<Option<RecoveryToken>> {
        let token = sqlx::query_as::<_, RecoveryToken>(
            "SELECT id, user_id, code, expires_at, created_at
             FROM recovery_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }
}
