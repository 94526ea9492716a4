use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, ValueEnum};

/// Width of the `messages.text` column.
pub const MAX_TEXT_LENGTH: usize = 255;
/// Upper bound for the dispatch backlog, far below tokio's channel limit.
pub const MAX_DISPATCH_CAPACITY: usize = 1 << 20;
/// Upper bound for concurrently handled submissions.
pub const MAX_DISPATCH_WORKERS: usize = 1024;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Which persistence backend stores messages
    #[arg(long, env = "HERALD_STORAGE_BACKEND", value_enum, default_value_t = StorageBackend::Postgres)]
    pub storage_backend: StorageBackend,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub dispatch: DispatchConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// PostgreSQL through a sqlx connection pool
    #[default]
    Postgres,
    /// Process-local storage, lost on restart
    Memory,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL (required for the postgres backend)
    #[arg(long = "database-url", env = "HERALD_DATABASE_URL")]
    pub url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long, env = "HERALD_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long, env = "HERALD_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection before failing
    #[arg(long, env = "HERALD_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    /// Seconds an idle connection may live
    #[arg(long, env = "HERALD_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// Maximum lifetime of a single connection in seconds
    #[arg(long, env = "HERALD_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 2,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "HERALD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API
    #[arg(long, env = "HERALD_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for liveness and readiness probes
    #[arg(long, env = "HERALD_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "HERALD_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, mgmt_port: 9090, shutdown_timeout_secs: 10 }
    }
}

/// What the submission worker does with a command whose handling failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Log the failure and move on
    #[default]
    Drop,
    /// Retry with exponential backoff, then drop
    Retry,
    /// Park the command in the dead-letter box
    DeadLetter,
}

#[derive(Clone, Debug, Args)]
pub struct DispatchConfig {
    /// Number of submissions that may wait in the dispatch channel
    #[arg(
        long = "dispatch-capacity",
        env = "HERALD_DISPATCH_CAPACITY",
        default_value_t = 1024,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_DISPATCH_CAPACITY as u64)
    )]
    pub capacity: usize,

    /// Number of submissions handled concurrently
    #[arg(
        long = "dispatch-workers",
        env = "HERALD_DISPATCH_WORKERS",
        default_value_t = 1,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_DISPATCH_WORKERS as u64)
    )]
    pub workers: usize,

    /// Policy applied when handling a submission fails
    #[arg(long = "dispatch-failure-policy", env = "HERALD_DISPATCH_FAILURE_POLICY", value_enum, default_value_t = FailurePolicy::Drop)]
    pub failure_policy: FailurePolicy,

    /// Additional attempts made by the retry policy
    #[arg(long = "dispatch-retry-attempts", env = "HERALD_DISPATCH_RETRY_ATTEMPTS", default_value_t = 3)]
    pub retry_attempts: usize,

    /// Initial retry backoff in milliseconds
    #[arg(long = "dispatch-min-backoff-ms", env = "HERALD_DISPATCH_MIN_BACKOFF_MS", default_value_t = 100)]
    pub min_backoff_ms: u64,

    /// Upper bound for the retry backoff in milliseconds
    #[arg(long = "dispatch-max-backoff-ms", env = "HERALD_DISPATCH_MAX_BACKOFF_MS", default_value_t = 5000)]
    pub max_backoff_ms: u64,

    /// Number of failed submissions kept by the dead-letter policy
    #[arg(long = "dead-letter-capacity", env = "HERALD_DEAD_LETTER_CAPACITY", default_value_t = 1000)]
    pub dead_letter_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            workers: 1,
            failure_policy: FailurePolicy::Drop,
            retry_attempts: 3,
            min_backoff_ms: 100,
            max_backoff_ms: 5000,
            dead_letter_capacity: 1000,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Maximum message length in characters, at most the width of the text column
    #[arg(
        long,
        env = "HERALD_MAX_TEXT_LENGTH",
        default_value_t = MAX_TEXT_LENGTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_TEXT_LENGTH as u64)
    )]
    pub max_text_length: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self { max_text_length: MAX_TEXT_LENGTH }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; telemetry export is disabled when unset
    #[arg(long, env = "HERALD_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "HERALD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Default log filter used when RUST_LOG is unset
    #[arg(long, env = "HERALD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }

    /// Checks the bounds the command line parser enforces, for configs built in code.
    ///
    /// # Errors
    /// Returns a description of the first out-of-range setting.
    pub fn validate(&self) -> Result<(), String> {
        check_range("max_text_length", self.messaging.max_text_length, MAX_TEXT_LENGTH)?;
        check_range("dispatch capacity", self.dispatch.capacity, MAX_DISPATCH_CAPACITY)?;
        check_range("dispatch workers", self.dispatch.workers, MAX_DISPATCH_WORKERS)
    }
}

fn check_range(name: &str, value: usize, max: usize) -> Result<(), String> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("{name} must be between 1 and {max}, got {value}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            dispatch: DispatchConfig::default(),
            messaging: MessagingConfig::default(),
            telemetry: TelemetryConfig { log_level: "info".to_string(), ..TelemetryConfig::default() },
        }
    }
}
