use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Delivery state of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Read,
}

impl MessageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "read" => Ok(Self::Read),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Reasons a submitted text is rejected before it is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    Empty,
    TooLong { max: usize },
    NulCharacter,
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Text is required"),
            Self::TooLong { max } => write!(f, "Text is too long (max {max} characters)"),
            Self::NulCharacter => f.write_str("Text must not contain NUL characters"),
        }
    }
}

/// Message body that has passed length validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    /// Validates `raw` against the configured length limit.
    ///
    /// Whitespace-only input counts as empty. The text itself is stored as given.
    ///
    /// # Errors
    /// Returns `TextError::Empty`, `TextError::TooLong` or `TextError::NulCharacter`.
    pub fn parse(raw: impl Into<String>, max_chars: usize) -> Result<Self, TextError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TextError::Empty);
        }
        if raw.chars().count() > max_chars {
            return Err(TextError::TooLong { max: max_chars });
        }
        // postgres text columns cannot hold U+0000
        if raw.contains('\0') {
            return Err(TextError::NulCharacter);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Command carrying one accepted submission to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessage {
    pub text: MessageText,
}

impl SendMessage {
    #[must_use]
    pub const fn new(text: MessageText) -> Self {
        Self { text }
    }
}

/// A fully populated message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub uuid: Uuid,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: OffsetDateTime,
}

impl NewMessage {
    /// Builds the record for a freshly handled submission.
    #[must_use]
    pub fn from_command(command: SendMessage) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            text: command.text.into_inner(),
            status: MessageStatus::Sent,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub uuid: Uuid,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: OffsetDateTime,
}

impl Message {
    #[must_use]
    pub fn from_new(id: i64, new: NewMessage) -> Self {
        Self { id, uuid: new.uuid, text: new.text, status: new.status, created_at: new.created_at }
    }
}
