use crate::config::{DispatchConfig, FailurePolicy};
use crate::error::AppError;
use crate::services::dispatch::{DeadLetter, DeadLetterBox, DispatchReceiver, Envelope};
use crate::services::submission_handler::SendMessageHandler;
use backon::{ExponentialBuilder, Retryable};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    failures: Counter<u64>,
    dead_letters: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herald-server");
        Self {
            failures: meter
                .u64_counter("herald_submission_failures_total")
                .with_description("Total submissions that could not be stored, labelled by reason")
                .build(),
            dead_letters: meter
                .u64_counter("herald_dead_letters_total")
                .with_description("Total submissions moved to the dead-letter box")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
struct Processor {
    handler: SendMessageHandler,
    policy: FailurePolicy,
    backoff: ExponentialBuilder,
    dead_letters: DeadLetterBox,
    metrics: Metrics,
}

impl Processor {
    async fn process(&self, envelope: Envelope) {
        let Envelope { submission_id, command } = envelope;

        let result = match self.policy {
            FailurePolicy::Retry => {
                (|| self.handler.handle(command.clone()))
                    .retry(&self.backoff)
                    .when(AppError::is_transient)
                    .notify(|e, delay| {
                        tracing::warn!(error = %e, retry_in_ms = delay.as_millis(), "Storing submission failed, retrying");
                    })
                    .await
            }
            FailurePolicy::Drop | FailurePolicy::DeadLetter => self.handler.handle(command.clone()).await,
        };

        let error = match result {
            Ok(_) => return,
            Err(AppError::DuplicateKey) => {
                // uuids are generated per handling, so a collision means generation is broken
                tracing::error!(%submission_id, "Invariant violated: generated message uuid already exists");
                self.metrics.failures.add(1, &[KeyValue::new("reason", "duplicate_key")]);
                AppError::DuplicateKey
            }
            Err(e) => {
                self.metrics.failures.add(1, &[KeyValue::new("reason", "storage")]);
                e
            }
        };

        if self.policy == FailurePolicy::DeadLetter {
            tracing::warn!(%submission_id, error = %error, "Moving submission to dead-letter box");
            self.metrics.dead_letters.add(1, &[]);
            self.dead_letters.push(DeadLetter {
                submission_id,
                command,
                error: error.to_string(),
                failed_at: OffsetDateTime::now_utc(),
            });
        } else {
            tracing::error!(%submission_id, error = %error, "Dropping submission that could not be stored");
        }
    }
}

/// Drains the dispatch channel and stores each submission.
///
/// At most `workers` submissions are handled at once. On shutdown the channel is closed,
/// commands already queued are still handled, and in-flight handlers are awaited.
#[derive(Debug)]
pub struct SubmissionWorker {
    receiver: DispatchReceiver,
    processor: Processor,
    semaphore: Arc<Semaphore>,
}

impl SubmissionWorker {
    #[must_use]
    pub fn new(
        receiver: DispatchReceiver,
        handler: SendMessageHandler,
        dead_letters: DeadLetterBox,
        config: &DispatchConfig,
    ) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(config.min_backoff_ms))
            .with_max_delay(Duration::from_millis(config.max_backoff_ms))
            .with_max_times(config.retry_attempts);

        Self {
            receiver,
            processor: Processor {
                handler,
                policy: config.failure_policy,
                backoff,
                dead_letters,
                metrics: Metrics::new(),
            },
            semaphore: Arc::new(Semaphore::new(config.workers.max(1))),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            tokio::select! {
                envelope = self.receiver.recv() => {
                    match envelope {
                        Some(envelope) => self.spawn(&mut tasks, envelope).await,
                        None => break,
                    }
                }
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    Self::log_task_result(res);
                }
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Submission worker shutting down, draining queued submissions...");
        self.receiver.close();
        let mut drained = 0_usize;
        while let Some(envelope) = self.receiver.recv().await {
            drained += 1;
            self.spawn(&mut tasks, envelope).await;
        }
        while let Some(res) = tasks.join_next().await {
            Self::log_task_result(res);
        }
        tracing::info!(drained, "Submission worker stopped");
    }

    async fn spawn(&self, tasks: &mut JoinSet<()>, envelope: Envelope) {
        let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            tracing::error!(submission_id = %envelope.submission_id, "Worker semaphore closed, dropping submission");
            return;
        };

        let processor = self.processor.clone();
        let span = tracing::debug_span!("handle_submission", submission_id = %envelope.submission_id);
        tasks.spawn(
            async move {
                let _permit = permit;
                processor.process(envelope).await;
            }
            .instrument(span),
        );
    }

    fn log_task_result(res: Result<(), tokio::task::JoinError>) {
        if let Err(e) = res {
            tracing::error!(error = %e, "Submission task panicked");
        }
    }
}
