//! Append-only security audit log.
//!
//! Rows are only ever inserted. The service layer wraps `record` and
//! swallows failures so auditing never breaks an auth flow.

use super::DbPool;
use crate::Result;

/// Audit log entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: i64,
    /// Acting user (None for pre-auth events like unknown email).
    pub user_id: Option<i64>,
    /// Event name (e.g. LOGIN_SUCCESS, PASSWORD_MIGRATED).
    pub event: String,
    /// Free-form detail.
    pub detail: Option<String>,
    /// Client IP.
    pub ip: Option<String>,
    /// Entry timestamp.
    pub created_at: String,
}

/// Repository for audit log operations.
pub struct AuditLogRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AuditLogRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record an audit event.
    pub async fn record(
        &self,
        user_id: Option<i64>,
        event: &str,
        detail: Option<&str>,
        ip: Option<&str>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO audit_log (user_id, event, detail, ip) VALUES ($1, $2, $3, $4)")
            .bind(user_id)
            .bind(event)
            .bind(detail)
            .bind(ip)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Fetch the most recent entries, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, user_id, event, detail, ip, created_at
             FROM audit_log ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Fetch the most recent entries for a user, newest first.
    pub async fn recent_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, user_id, event, detail, ip, created_at
             FROM audit_log WHERE user_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
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

    #[tokio::test]
    async fn test_record_and_fetch() {
        let db = setup_db().await;
        let repo = AuditLogRepository::new(db.pool());

        repo.record(Some(1), "LOGIN_SUCCESS", None, Some("10.0.0.1"))
            .await
            .unwrap();
        repo.record(None, "LOGIN_USER_NOT_FOUND", Some("ghost@example.com"), None)
            .await
            .unwrap();

        let entries = repo.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].event, "LOGIN_USER_NOT_FOUND");
        assert!(entries[0].user_id.is_none());
        assert_eq!(entries[1].event, "LOGIN_SUCCESS");
        assert_eq!(entries[1].user_id, Some(1));
        assert_eq!(entries[1].ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_recent_for_user() {
        let db = setup_db().await;
        let repo = AuditLogRepository::new(db.pool());

        repo.record(Some(1), "LOGIN_SUCCESS", None, None)
            .await
            .unwrap();
        repo.record(None, "LOGIN_USER_NOT_FOUND", None, None)
            .await
            .unwrap();

        let entries = repo.recent_for_user(1, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "LOGIN_SUCCESS");
    }

    #[tokio::test]
    async fn test_limit() {
        let db = setup_db().await;
        let repo = AuditLogRepository::new(db.pool());

        for i in 0..5 {
            repo.record(Some(1), "LOGIN_FAILED_PASSWORD", Some(&format!("attempt {i}")), None)
                .await
                .unwrap();
        }

        let entries = repo.recent(3).await.unwrap();
        assert_eq!(entries.len(), 3);
    }
}
