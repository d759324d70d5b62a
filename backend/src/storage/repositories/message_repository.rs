use anyhow::Result;
use sqlx::Row;

use crate::storage::connection::DbConnection;
use shared::{FlashMessage, MessageLevel};

/// Repository for one-shot flash messages attached to a session
#[derive(Clone)]
pub struct MessageRepository {
    db: DbConnection,
}

impl MessageRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn push_message(&self, session_token: &str, message: &FlashMessage) -> Result<()> {
        sqlx::query("INSERT INTO flash_messages (session_token, level, text) VALUES (?, ?, ?)")
            .bind(session_token)
            .bind(message.level.as_str())
            .bind(&message.text)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Return the queued messages in insertion order and remove them
    pub async fn take_messages(&self, session_token: &str) -> Result<Vec<FlashMessage>> {
        let mut tx = self.db.pool().begin().await?;

        let rows = sqlx::query("SELECT level, text FROM flash_messages WHERE session_token = ? ORDER BY id ASC")
            .bind(session_token)
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM flash_messages WHERE session_token = ?")
            .bind(session_token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        rows.iter()
            .map(|row| {
                let level: String = row.try_get("level")?;
                Ok(FlashMessage {
                    level: MessageLevel::parse(&level),
                    text: row.try_get("text")?,
                })
            })
            .collect()
    }
}
