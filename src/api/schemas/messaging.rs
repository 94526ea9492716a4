use crate::domain::message::{Message, MessageStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct ListMessagesQuery {
    pub status: Option<String>,
}

impl ListMessagesQuery {
    /// Parses the optional status filter.
    ///
    /// # Errors
    /// Returns a message suitable for the client when the status is not recognized.
    pub fn status(&self) -> Result<Option<MessageStatus>, &'static str> {
        self.status.as_deref().map(str::parse::<MessageStatus>).transpose().map_err(|_| "Invalid status")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub uuid: Uuid,
    pub text: String,
    pub status: MessageStatus,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self { uuid: message.uuid, text: message.text, status: message.status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub status: String,
    pub submission_id: Uuid,
}
