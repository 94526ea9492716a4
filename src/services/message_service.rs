use crate::adapters::MessageRepository;
use crate::config::MessagingConfig;
use crate::domain::message::{Message, MessageStatus, MessageText, SendMessage};
use crate::error::{AppError, Result};
use crate::services::dispatch::DispatchChannel;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    submitted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herald-server");
        Self {
            submitted_total: meter
                .u64_counter("herald_messages_submitted_total")
                .with_description("Total message submissions received over the API")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageService {
    repo: Arc<dyn MessageRepository>,
    dispatcher: DispatchChannel,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(repo: Arc<dyn MessageRepository>, dispatcher: DispatchChannel, config: MessagingConfig) -> Self {
        Self { repo, dispatcher, config, metrics: Metrics::new() }
    }

    /// Validates the text and queues it for storage. Returns before the message is stored.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the text is blank or too long.
    /// Returns `AppError::DispatchFailure` if the dispatch channel rejects the command.
    #[tracing::instrument(err(level = "warn"), skip(self, text), fields(text_len = text.len()))]
    pub fn submit(&self, text: String) -> Result<Uuid> {
        let text = match MessageText::parse(text, self.config.max_text_length) {
            Ok(text) => text,
            Err(e) => {
                self.metrics.submitted_total.add(1, &[KeyValue::new("status", "rejected")]);
                return Err(AppError::BadRequest(e.to_string()));
            }
        };

        match self.dispatcher.dispatch(SendMessage::new(text)) {
            Ok(submission_id) => {
                tracing::debug!(%submission_id, "Submission accepted");
                self.metrics.submitted_total.add(1, &[KeyValue::new("status", "accepted")]);
                Ok(submission_id)
            }
            Err(e) => {
                self.metrics.submitted_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// Lists stored messages, optionally restricted to one status.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list(&self, status: Option<MessageStatus>) -> Result<Vec<Message>> {
        self.repo.find_by_status(status).await
    }

    /// Marks a stored message as read.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no message has this uuid.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn mark_read(&self, uuid: Uuid) -> Result<Message> {
        self.repo.mark_read(uuid).await
    }
}
