//! # forum-worker
//!
//! Background task scheduler on a durable broker.
//!
//! - [`TaskClient`] enqueues tasks and registers recurring schedules
//! - [`Worker`] binds handlers to job types, runs due schedule ticks, and
//!   processes tasks with bounded concurrency, timeouts, and retries
//! - [`jobs::SyncHandler`] runs counter reconciliation for `interaction:sync`
//!
//! ```rust,ignore
//! let client = TaskClient::new(broker.clone());
//! client
//!     .register_schedule("@every 5m", SYNC_JOB_TYPE, &SyncPayload::all(), EnqueueOptions::default())
//!     .await?;
//!
//! let mut worker = Worker::new(broker);
//! worker.register_handler(SYNC_JOB_TYPE, Arc::new(SyncHandler::new(ctx, 100)));
//! let handle = worker.start(WorkerOptions::default()).await?;
//! // ...
//! handle.shutdown(Duration::from_secs(10)).await?;
//! ```

pub mod client;
pub mod error;
pub mod jobs;
pub mod schedule;
pub mod worker;

pub use client::{schedule_id, EnqueueOptions, TaskClient};
pub use error::{WorkerError, WorkerResult};
pub use jobs::{SyncHandler, SyncPayload, SYNC_JOB_TYPE};
pub use schedule::{Schedule, ScheduleError};
pub use worker::{
    retry_delay, FnHandler, HandlerError, ScheduleRunner, TaskHandler, Worker, WorkerHandle,
    WorkerOptions,
};
