//! Session repository for refresh token persistence.
//!
//! Every issued refresh token has a session row recording the client
//! context and the user's token version at issuance. Logout deletes
//! the row; global logout deletes all rows for a user.

use super::DbPool;
use crate::Result;

const SQL_NOW: &str = "datetime('now')";

/// Session entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Session ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Refresh token string.
    pub refresh_token: String,
    /// User's token version when the session was created.
    pub token_version: i64,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Client IP at login.
    pub ip: Option<String>,
    /// Client user agent at login.
    pub user_agent: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// New session for creation.
pub struct NewSession {
    /// User ID.
    pub user_id: i64,
    /// Refresh token string.
    pub refresh_token: String,
    /// User's current token version.
    pub token_version: i64,
    /// Expiration timestamp.
    pub expires_at: String,
    /// Client IP.
    pub ip: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new session.
    pub async fn create(&self, new_session: &NewSession) -> Result<Session> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sessions (user_id, refresh_token, token_version, expires_at, ip, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(new_session.user_id)
        .bind(&new_session.refresh_token)
        .bind(new_session.token_version)
        .bind(&new_session.expires_at)
        .bind(&new_session.ip)
        .bind(&new_session.user_agent)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| crate::DenticaError::NotFound("session".to_string()))
    }

    /// Get a session by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, refresh_token, token_version, expires_at, ip, user_agent, created_at
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Get a valid (unexpired) session by refresh token.
    pub async fn get_valid(&self, refresh_token: &str) -> Result<Option<Session>> {
        let sql = format!(
            "SELECT id, user_id, refresh_token, token_version, expires_at, ip, user_agent, created_at
             FROM sessions
             WHERE refresh_token = $1 AND expires_at > {SQL_NOW}"
        );
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(refresh_token)
            .fetch_optional(self.pool)
            .await?;

        Ok(session)
    }

    /// Delete a session by refresh token.
    ///
    /// Returns true if a session was deleted.
    pub async fn delete(&self, refresh_token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for a user.
    ///
    /// Returns the number of deleted sessions.
    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired sessions (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!("DELETE FROM sessions WHERE expires_at <= {SQL_NOW}");
        let result = sqlx::query(&sql).execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Count live sessions for a user.
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(db.pool())
            .create(&NewUser::new("Ana", "Gomez", "ana@example.com", "hash"))
            .await
            .unwrap();
        db
    }

    fn session(token: &str, expires_at: &str) -> NewSession {
        NewSession {
            user_id: 1,
            refresh_token: token.to_string(),
            token_version: 1,
            expires_at: expires_at.to_string(),
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_session() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        let created = repo
            .create(&session("tok-1", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_eq!(created.user_id, 1);
        assert_eq!(created.refresh_token, "tok-1");
        assert_eq!(created.token_version, 1);
        assert_eq!(created.ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_get_valid() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&session("valid", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&session("expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid("valid").await.unwrap().is_some());
        assert!(repo.get_valid("expired").await.unwrap().is_none());
        assert!(repo.get_valid("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&session("tok", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(repo.delete("tok").await.unwrap());
        assert!(repo.get_valid("tok").await.unwrap().is_none());
        // Second delete is a no-op
        assert!(!repo.delete("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        for i in 0..3 {
            repo.create(&session(&format!("tok-{i}"), "2099-12-31 23:59:59"))
                .await
                .unwrap();
        }

        assert_eq!(repo.count_for_user(1).await.unwrap(), 3);
        assert_eq!(repo.delete_all_for_user(1).await.unwrap(), 3);
        assert_eq!(repo.count_for_user(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&session("old", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&session("new", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 1);
        assert!(repo.get_valid("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_refresh_token_rejected() {
        let db = setup_db().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&session("dup", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        let result = repo.create(&session("dup", "2099-12-31 23:59:59")).await;
        assert!(result.is_err());
    }
}
