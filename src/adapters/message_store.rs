use crate::domain::message::{Message, MessageStatus, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Durable storage for messages.
#[async_trait]
pub trait MessageRepository: Send + Sync + std::fmt::Debug {
    /// Inserts a new message as a single atomic write.
    ///
    /// # Errors
    /// Returns `AppError::DuplicateKey` if a message with the same uuid exists.
    /// Returns `AppError::Database` on any other storage fault.
    async fn save(&self, message: NewMessage) -> Result<Message>;

    /// Returns every message with the given status, or all messages when `status` is `None`.
    ///
    /// Results are ordered by creation time, oldest first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    async fn find_by_status(&self, status: Option<MessageStatus>) -> Result<Vec<Message>>;

    /// Moves a message from `sent` to `read`. Already-read messages are returned unchanged.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no message has this uuid.
    async fn mark_read(&self, uuid: Uuid) -> Result<Message>;

    /// Checks that the backing store is reachable.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn ping(&self) -> Result<()>;
}
