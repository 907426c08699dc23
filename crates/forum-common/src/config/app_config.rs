//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub sync: SyncConfig,
    pub worker: WorkerConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Migrations applied at worker startup when set
    #[serde(default)]
    pub migrations_dir: Option<String>,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Counter reconciliation settings
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Schedule expression for the recurring sync, e.g. `@every 5m`
    #[serde(default = "default_sync_schedule")]
    pub schedule: String,
    /// Dirty ids processed per batch
    #[serde(default = "default_sync_batch_size")]
    pub batch_size: usize,
    /// Retries after the first failed attempt of a sync task
    #[serde(default = "default_sync_max_retry")]
    pub max_retry: u32,
    /// Queue the sync tasks are placed on
    #[serde(default = "default_sync_queue")]
    pub queue: String,
    /// Enqueue one sync immediately when the worker starts
    #[serde(default = "default_true")]
    pub on_startup: bool,
    /// Per-run timeout in seconds
    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schedule: default_sync_schedule(),
            batch_size: default_sync_batch_size(),
            max_retry: default_sync_max_retry(),
            queue: default_sync_queue(),
            on_startup: true,
            timeout_secs: default_sync_timeout(),
        }
    }
}

/// Background worker pool settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of tasks driven concurrently
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,
    /// Sleep between queue polls when idle, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Time allowed for in-flight tasks on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_worker_concurrency(),
            poll_interval_ms: default_poll_interval(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "forum-interactions".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_sync_schedule() -> String {
    "@every 5m".to_string()
}

fn default_sync_batch_size() -> usize {
    100
}

fn default_sync_max_retry() -> u32 {
    3
}

fn default_sync_queue() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sync_timeout() -> u64 {
    120
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_shutdown_timeout() -> u64 {
    10
}

/// Parse an optional environment variable, falling back to `default` when unset.
///
/// A set but unparsable value is an error rather than a silent default.
fn parse_var<T: FromStr>(name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
                migrations_dir: env::var("DATABASE_MIGRATIONS_DIR").ok().filter(|d| !d.is_empty()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
            },
            sync: SyncConfig {
                schedule: env::var("SYNC_SCHEDULE").unwrap_or_else(|_| default_sync_schedule()),
                batch_size: parse_var("SYNC_BATCH_SIZE", default_sync_batch_size)?,
                max_retry: parse_var("SYNC_MAX_RETRY", default_sync_max_retry)?,
                queue: env::var("SYNC_QUEUE").unwrap_or_else(|_| default_sync_queue()),
                on_startup: parse_var("SYNC_ON_STARTUP", default_true)?,
                timeout_secs: parse_var("SYNC_TIMEOUT_SECS", default_sync_timeout)?,
            },
            worker: WorkerConfig {
                concurrency: parse_var("WORKER_CONCURRENCY", default_worker_concurrency)?,
                poll_interval_ms: parse_var("WORKER_POLL_INTERVAL_MS", default_poll_interval)?,
                shutdown_timeout_secs: parse_var(
                    "WORKER_SHUTDOWN_TIMEOUT_SECS",
                    default_shutdown_timeout,
                )?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
