use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::domain::models::transaction::{format_timestamp, parse_timestamp};
use crate::domain::models::Session;
use crate::storage::connection::DbConnection;

/// Repository for login sessions
#[derive(Clone)]
pub struct SessionRepository {
    db: DbConnection,
}

impl SessionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_session(&self, session: &Session) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(format_timestamp(&session.created_at))
            .bind(format_timestamp(&session.expires_at))
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(r) => {
                let created_at: String = r.try_get("created_at")?;
                let expires_at: String = r.try_get("expires_at")?;
                Ok(Some(Session {
                    token: r.try_get("token")?,
                    user_id: r.try_get("user_id")?,
                    created_at: parse_timestamp(&created_at)?,
                    expires_at: parse_timestamp(&expires_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Returns true if a session was deleted
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every session that expired before `now`
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_timestamp(&now))
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::seed_user;
    use chrono::Duration;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = DbConnection::init_test().await.unwrap();
        let user = seed_user(&db, "quinn").await;
        let repo = SessionRepository::new(db);

        let now = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let live = Session {
            token: "live-token".to_string(),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        let stale = Session {
            token: "stale-token".to_string(),
            user_id: user.id,
            created_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };
        repo.store_session(&live).await.unwrap();
        repo.store_session(&stale).await.unwrap();

        assert_eq!(repo.get_session("live-token").await.unwrap(), Some(live));
        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert!(repo.get_session("stale-token").await.unwrap().is_none());

        assert!(repo.delete_session("live-token").await.unwrap());
        assert!(!repo.delete_session("live-token").await.unwrap());
    }
}
