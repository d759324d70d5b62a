use shared::{FlashMessage, MessageLevel};
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::storage::{DbConnection, MessageRepository};

/// One-shot messages shown on the next page a session renders
#[derive(Clone)]
pub struct MessageService {
    message_repository: MessageRepository,
}

impl MessageService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            message_repository: MessageRepository::new(db),
        }
    }

    pub async fn success(&self, session_token: &str, text: impl Into<String>) -> DomainResult<()> {
        self.push(session_token, MessageLevel::Success, text.into()).await
    }

    pub async fn error(&self, session_token: &str, text: impl Into<String>) -> DomainResult<()> {
        self.push(session_token, MessageLevel::Error, text.into()).await
    }

    /// Drain the queued messages
    pub async fn take(&self, session_token: &str) -> DomainResult<Vec<FlashMessage>> {
        Ok(self.message_repository.take_messages(session_token).await?)
    }

    async fn push(&self, session_token: &str, level: MessageLevel, text: String) -> DomainResult<()> {
        debug!("Queueing {} message: {}", level.as_str(), text);
        self.message_repository
            .push_message(session_token, &FlashMessage { level, text })
            .await?;
        Ok(())
    }
}
