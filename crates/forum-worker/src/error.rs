//! Worker error types

use forum_core::DomainError;

use crate::schedule::ScheduleError;

/// Errors raised by the client and the worker runtime (never by handlers)
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Broker error: {0}")]
    Broker(#[from] DomainError),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker loop panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Timed out waiting for the worker to stop")]
    ShutdownTimeout,
}

pub type WorkerResult<T> = Result<T, WorkerError>;
