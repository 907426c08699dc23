//! Durable task broker port used by the task scheduler.
//!
//! A task moves through `pending -> active -> (ack | retry | archive)`. A task
//! only leaves `active` when the worker reports an outcome, so a crashed
//! worker's tasks can be re-queued and run again (at-least-once delivery).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repositories::RepoResult;

/// A unit of work waiting in, or checked out of, a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Unique task id
    pub id: String,
    /// Handler binding key, e.g. `interaction:sync`
    pub job_type: String,
    /// Handler-defined JSON payload
    pub payload: serde_json::Value,
    /// Queue name
    pub queue: String,
    /// Maximum number of retries after the first attempt
    pub max_retry: u32,
    /// Retries performed so far
    #[serde(default)]
    pub retried: u32,
    /// Per-task timeout override in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Last handler error, if the task has failed before
    #[serde(default)]
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskMessage {
    /// Check whether another attempt is allowed after a failure
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.retried < self.max_retry
    }
}

/// A persisted recurring trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Stable schedule id
    pub id: String,
    /// Schedule expression, e.g. `@every 5m`
    pub spec: String,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub queue: String,
    pub max_retry: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub registered_at: DateTime<Utc>,
}

#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Append a task to its queue's pending list
    async fn push(&self, task: &TaskMessage) -> RepoResult<()>;

    /// Check out the oldest pending task of a queue, moving it to `active`
    async fn pop(&self, queue: &str) -> RepoResult<Option<TaskMessage>>;

    /// Mark a checked-out task complete
    async fn ack(&self, task: &TaskMessage) -> RepoResult<()>;

    /// Move a checked-out task to the retry set, due at `process_at`
    async fn retry(&self, task: &TaskMessage, process_at: DateTime<Utc>) -> RepoResult<()>;

    /// Move a checked-out task to the archive; it will not run again
    async fn archive(&self, task: &TaskMessage) -> RepoResult<()>;

    /// Move retry-set tasks due at or before `now` back to pending
    async fn promote_due(&self, queue: &str, now: DateTime<Utc>) -> RepoResult<usize>;

    /// Move every task left in `active` back to pending
    async fn requeue_active(&self, queue: &str) -> RepoResult<usize>;

    /// Persist (or overwrite) a schedule entry
    async fn save_schedule(&self, entry: &ScheduleEntry) -> RepoResult<()>;

    /// List persisted schedule entries
    async fn schedules(&self) -> RepoResult<Vec<ScheduleEntry>>;

    /// Claim one tick of a schedule. Only the first caller for a given
    /// `(schedule_id, tick)` gets `true`.
    async fn claim_tick(&self, schedule_id: &str, tick: DateTime<Utc>) -> RepoResult<bool>;
}
