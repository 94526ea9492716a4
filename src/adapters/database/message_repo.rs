use crate::adapters::database::DbPool;
use crate::adapters::database::records::MessageRecord;
use crate::adapters::message_store::MessageRepository;
use crate::domain::message::{Message, MessageStatus, NewMessage};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn into_message(record: MessageRecord) -> Result<Message> {
        Message::try_from(record).map_err(AppError::Internal)
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[tracing::instrument(level = "debug", skip(self, message), fields(message_uuid = %message.uuid))]
    async fn save(&self, message: NewMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (uuid, text, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, uuid, text, status, created_at
            "#,
        )
        .bind(message.uuid)
        .bind(&message.text)
        .bind(message.status.as_str())
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await;

        let record = match result {
            Ok(record) => record,
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                return Err(AppError::DuplicateKey);
            }
            Err(e) => return Err(AppError::Database(e)),
        };

        tx.commit().await?;
        Self::into_message(record)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn find_by_status(&self, status: Option<MessageStatus>) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, uuid, text, status, created_at
            FROM messages
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(status.map(MessageStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(Self::into_message).collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn mark_read(&self, uuid: Uuid) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            UPDATE messages
            SET status = $2
            WHERE uuid = $1
            RETURNING id, uuid, text, status, created_at
            "#,
        )
        .bind(uuid)
        .bind(MessageStatus::Read.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        Self::into_message(record)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
