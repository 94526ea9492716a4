use crate::domain::message::{Message, MessageStatus};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: i64,
    pub(crate) uuid: Uuid,
    pub(crate) text: String,
    pub(crate) status: String,
    pub(crate) created_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = String;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse::<MessageStatus>().map_err(|e| e.to_string())?;
        Ok(Self { id: record.id, uuid: record.uuid, text: record.text, status, created_at: record.created_at })
    }
}
