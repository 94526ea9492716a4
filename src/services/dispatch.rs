use crate::domain::message::SendMessage;
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    dispatched_total: Counter<u64>,
    failures_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herald-server");
        Self {
            dispatched_total: meter
                .u64_counter("herald_dispatched_total")
                .with_description("Total submissions handed to the dispatch channel")
                .build(),
            failures_total: meter
                .u64_counter("herald_dispatch_failures_total")
                .with_description("Total submissions the dispatch channel could not accept")
                .build(),
        }
    }
}

/// A command in flight between the API and the submission worker.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub submission_id: Uuid,
    pub command: SendMessage,
}

/// Producer side of the in-process submission queue.
///
/// Commands live only in memory: anything still queued when the process dies is lost.
#[derive(Clone, Debug)]
pub struct DispatchChannel {
    tx: mpsc::Sender<Envelope>,
    metrics: Metrics,
}

/// Consumer side of the submission queue, owned by the submission worker.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: mpsc::Receiver<Envelope>,
}

/// Creates a bounded dispatch channel holding at most `capacity` queued commands.
#[must_use]
pub fn channel(capacity: usize) -> (DispatchChannel, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DispatchChannel { tx, metrics: Metrics::new() }, DispatchReceiver { rx })
}

impl DispatchChannel {
    /// Queues a command for asynchronous handling without waiting for it to be processed.
    ///
    /// # Errors
    /// Returns `AppError::DispatchFailure` if the backlog is full or the worker is gone.
    #[tracing::instrument(level = "debug", skip(self, command), fields(submission_id = tracing::field::Empty), err)]
    pub fn dispatch(&self, command: SendMessage) -> Result<Uuid> {
        let submission_id = Uuid::now_v7();
        tracing::Span::current().record("submission_id", tracing::field::display(submission_id));

        match self.tx.try_send(Envelope { submission_id, command }) {
            Ok(()) => {
                self.metrics.dispatched_total.add(1, &[]);
                Ok(submission_id)
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.failures_total.add(1, &[KeyValue::new("reason", "full")]);
                Err(AppError::DispatchFailure("backlog is full".into()))
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.failures_total.add(1, &[KeyValue::new("reason", "closed")]);
                Err(AppError::DispatchFailure("channel is closed".into()))
            }
        }
    }

    /// Number of commands currently waiting to be picked up.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl DispatchReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Stops accepting new commands. Already queued commands can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// A submission that could not be stored.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub submission_id: Uuid,
    pub command: SendMessage,
    pub error: String,
    pub failed_at: OffsetDateTime,
}

/// Bounded holding area for failed submissions. The oldest entry is evicted when full.
#[derive(Clone, Debug)]
pub struct DeadLetterBox {
    entries: Arc<Mutex<VecDeque<DeadLetter>>>,
    capacity: usize,
}

impl DeadLetterBox {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: Arc::new(Mutex::new(VecDeque::new())), capacity: capacity.max(1) }
    }

    pub fn push(&self, letter: DeadLetter) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            if let Some(evicted) = entries.pop_front() {
                tracing::warn!(submission_id = %evicted.submission_id, "Dead-letter box full, evicting oldest entry");
            }
        }
        entries.push_back(letter);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
