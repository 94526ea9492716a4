use crate::adapters::MessageRepository;
use crate::services::dispatch::DispatchChannel;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
    pub backlog: Gauge<u64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("herald-server");
        Self {
            status: meter
                .i64_gauge("herald_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
            backlog: meter
                .u64_gauge("herald_dispatch_backlog")
                .with_description("Submissions waiting in the dispatch channel")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    repo: Arc<dyn MessageRepository>,
    dispatcher: DispatchChannel,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(repo: Arc<dyn MessageRepository>, dispatcher: DispatchChannel) -> Self {
        Self { repo, dispatcher, metrics: Metrics::new() }
    }

    /// Checks storage connectivity.
    ///
    /// # Errors
    /// Returns a string describing the failure if storage is unreachable.
    pub async fn check_db(&self) -> Result<(), String> {
        let res = match timeout(CHECK_TIMEOUT, self.repo.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("database unreachable: {e}")),
            Err(_) => Err("database check timed out".to_string()),
        };

        let value = i64::from(res.is_ok());
        self.metrics.status.record(value, &[KeyValue::new("component", "database")]);
        res
    }

    /// Current number of queued submissions.
    #[must_use]
    pub fn dispatch_backlog(&self) -> usize {
        let backlog = self.dispatcher.backlog();
        self.metrics.backlog.record(backlog as u64, &[]);
        backlog
    }
}
