use crate::adapters::message_store::MessageRepository;
use crate::domain::message::{Message, MessageStatus, NewMessage};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: Vec<Message>,
    by_uuid: HashMap<Uuid, usize>,
}

/// Process-local message storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMessageRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryMessageRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save(&self, message: NewMessage) -> Result<Message> {
        let mut table = self.table.write().await;
        if table.by_uuid.contains_key(&message.uuid) {
            return Err(AppError::DuplicateKey);
        }

        table.next_id += 1;
        let stored = Message::from_new(table.next_id, message);
        let index = table.rows.len();
        table.by_uuid.insert(stored.uuid, index);
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_status(&self, status: Option<MessageStatus>) -> Result<Vec<Message>> {
        let table = self.table.read().await;
        let mut messages: Vec<Message> =
            table.rows.iter().filter(|m| status.is_none_or(|s| m.status == s)).cloned().collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn mark_read(&self, uuid: Uuid) -> Result<Message> {
        let mut table = self.table.write().await;
        let index = *table.by_uuid.get(&uuid).ok_or(AppError::NotFound)?;
        let message = &mut table.rows[index];
        message.status = MessageStatus::Read;
        Ok(message.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
