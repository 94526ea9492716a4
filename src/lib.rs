#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::MessageRepository;
use crate::adapters::database::DbPool;
use crate::adapters::database::message_repo::PgMessageRepository;
use crate::adapters::memory::InMemoryMessageRepository;
use crate::api::ServiceContainer;
use crate::config::{Config, StorageBackend};
use crate::services::dispatch::{self, DeadLetterBox};
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use crate::services::submission_handler::SendMessageHandler;
use crate::workers::SubmissionWorker;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Background tasks owned by the application.
#[derive(Debug)]
pub struct Workers {
    pub submission: SubmissionWorker,
}

impl Workers {
    /// Spawns every worker, returning handles that finish once shutdown completes.
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.submission.run(shutdown_rx).instrument(tracing::info_span!("submission_worker")))]
    }
}

/// A fully wired application, ready to be served.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub dead_letters: DeadLetterBox,
    pub workers: Workers,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    pool: Option<DbPool>,
    repository: Option<Arc<dyn MessageRepository>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, pool: None, repository: None }
    }

    #[must_use]
    pub fn with_database(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Uses the given repository instead of the configured storage backend.
    #[must_use]
    pub fn with_repository(mut self, repository: Arc<dyn MessageRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Wires repositories, services and workers together.
    ///
    /// # Errors
    /// Returns an error if a setting is out of range, or if the postgres backend is
    /// selected but no pool was provided.
    pub fn build(self) -> anyhow::Result<App> {
        self.config.validate().map_err(anyhow::Error::msg)?;

        let repository: Arc<dyn MessageRepository> = match (self.repository, self.config.storage_backend) {
            (Some(repository), _) => repository,
            (None, StorageBackend::Memory) => Arc::new(InMemoryMessageRepository::new()),
            (None, StorageBackend::Postgres) => {
                let pool = self.pool.ok_or_else(|| anyhow::anyhow!("postgres backend requires a database pool"))?;
                Arc::new(PgMessageRepository::new(pool))
            }
        };

        let (dispatcher, receiver) = dispatch::channel(self.config.dispatch.capacity);
        let dead_letters = DeadLetterBox::new(self.config.dispatch.dead_letter_capacity);

        let handler = SendMessageHandler::new(Arc::clone(&repository));
        let submission =
            SubmissionWorker::new(receiver, handler, dead_letters.clone(), &self.config.dispatch);

        let message_service =
            MessageService::new(Arc::clone(&repository), dispatcher.clone(), self.config.messaging.clone());
        let health_service = HealthService::new(repository, dispatcher);

        Ok(App {
            services: ServiceContainer { message_service },
            health_service,
            dead_letters,
            workers: Workers { submission },
        })
    }
}

/// Applies pending database migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Flips the shutdown flag on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing so they reach the configured log sinks.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic = %info, %location, "Application panicked");
        default_hook(info);
    }));
}
