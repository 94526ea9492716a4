use crate::adapters::MessageRepository;
use crate::domain::message::{Message, NewMessage, SendMessage};
use crate::error::Result;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    persisted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herald-server");
        Self {
            persisted_total: meter
                .u64_counter("herald_messages_persisted_total")
                .with_description("Total submissions handled, labelled by outcome")
                .build(),
        }
    }
}

/// Turns a dispatched `SendMessage` into a stored message.
///
/// Holds no per-call state, so one instance can serve any number of concurrent commands.
#[derive(Clone, Debug)]
pub struct SendMessageHandler {
    repo: Arc<dyn MessageRepository>,
    metrics: Metrics,
}

impl SendMessageHandler {
    #[must_use]
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo, metrics: Metrics::new() }
    }

    /// Generates the uuid, status and timestamp for the command and saves the result.
    ///
    /// Failures are returned as-is; retrying is up to the caller.
    ///
    /// # Errors
    /// Returns `AppError::DuplicateKey` or `AppError::Database` from the repository.
    #[tracing::instrument(level = "debug", skip_all, err(level = "warn"))]
    pub async fn handle(&self, command: SendMessage) -> Result<Message> {
        let message = NewMessage::from_command(command);

        match self.repo.save(message).await {
            Ok(stored) => {
                tracing::debug!(message_uuid = %stored.uuid, "Message stored");
                self.metrics.persisted_total.add(1, &[KeyValue::new("status", "success")]);
                Ok(stored)
            }
            Err(e) => {
                self.metrics.persisted_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }
}
