//! Task client - enqueue tasks and register recurring schedules

use chrono::Utc;
use forum_common::SyncConfig;
use forum_core::{ScheduleEntry, TaskBroker, TaskMessage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::WorkerResult;
use crate::schedule::Schedule;

/// Namespace for deterministic schedule ids
const SCHEDULE_NAMESPACE: Uuid = Uuid::from_u128(0x6f72_756d_2d73_6368_6564_756c_6572_0001);

/// Enqueue options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub queue: String,
    /// Retries after the first attempt
    pub max_retry: u32,
    /// Per-task timeout override in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            queue: "default".to_string(),
            max_retry: 3,
            timeout_secs: None,
        }
    }
}

impl From<&SyncConfig> for EnqueueOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            max_retry: config.max_retry,
            timeout_secs: Some(config.timeout_secs),
        }
    }
}

/// Stable id for a schedule registration.
///
/// Registering the same spec, job type, payload, and queue again yields the
/// same id, so restarts overwrite the entry instead of adding a duplicate.
#[must_use]
pub fn schedule_id(spec: &str, job_type: &str, payload: &serde_json::Value, queue: &str) -> String {
    let name = format!("{}|{}|{}|{}", spec.trim(), job_type, payload, queue);
    Uuid::new_v5(&SCHEDULE_NAMESPACE, name.as_bytes()).to_string()
}

/// Producer side of the task queue
#[derive(Clone)]
pub struct TaskClient {
    broker: Arc<dyn TaskBroker>,
}

impl TaskClient {
    pub fn new(broker: Arc<dyn TaskBroker>) -> Self {
        Self { broker }
    }

    /// Enqueue one task and return its id
    #[instrument(skip(self, payload, options), fields(queue = %options.queue))]
    pub async fn enqueue<P: Serialize + ?Sized>(
        &self,
        job_type: &str,
        payload: &P,
        options: EnqueueOptions,
    ) -> WorkerResult<String> {
        let task = TaskMessage {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: serde_json::to_value(payload)?,
            queue: options.queue,
            max_retry: options.max_retry,
            retried: 0,
            timeout_secs: options.timeout_secs,
            last_error: None,
            enqueued_at: Utc::now(),
        };

        self.broker.push(&task).await?;
        info!(task_id = %task.id, "Task enqueued");
        Ok(task.id)
    }

    /// Register a recurring schedule and return its id.
    ///
    /// The spec is validated before anything is persisted.
    #[instrument(skip(self, payload, options))]
    pub async fn register_schedule<P: Serialize + ?Sized>(
        &self,
        spec: &str,
        job_type: &str,
        payload: &P,
        options: EnqueueOptions,
    ) -> WorkerResult<String> {
        Schedule::parse(spec)?;

        let payload = serde_json::to_value(payload)?;
        let id = schedule_id(spec, job_type, &payload, &options.queue);
        let entry = ScheduleEntry {
            id: id.clone(),
            spec: spec.trim().to_string(),
            job_type: job_type.to_string(),
            payload,
            queue: options.queue,
            max_retry: options.max_retry,
            timeout_secs: options.timeout_secs,
            registered_at: Utc::now(),
        };

        self.broker.save_schedule(&entry).await?;
        info!(schedule_id = %id, "Schedule registered");
        Ok(id)
    }
}
