//! Redis key-space.
//!
//! Key formats are stable: other services and dashboards read them directly.

use chrono::{DateTime, Utc};
use forum_core::{Id, TargetKind};

/// Key prefix for counter hashes
pub const STATS_PREFIX: &str = "stats:";
/// Key prefix for per-user action flags
pub const USER_ACTION_PREFIX: &str = "useraction:";
/// Key prefix for dirty sets
pub const DIRTY_PREFIX: &str = "dirty:";
/// Key prefix for task queues
pub const QUEUE_PREFIX: &str = "queue:";
/// Hash holding every registered schedule
pub const SCHEDULES_KEY: &str = "scheduler:entries";
/// Key prefix for per-tick schedule claims
pub const TICK_PREFIX: &str = "scheduler:tick:";

/// `stats:{target_kind}:{target_id}`
#[must_use]
pub fn stats_key(kind: TargetKind, target_id: Id) -> String {
    format!("{STATS_PREFIX}{kind}:{target_id}")
}

/// `useraction:{target_kind}:{actor_id}:{target_id}`
#[must_use]
pub fn user_action_key(kind: TargetKind, actor_id: Id, target_id: Id) -> String {
    format!("{USER_ACTION_PREFIX}{kind}:{actor_id}:{target_id}")
}

/// `dirty:{target_kind}`
#[must_use]
pub fn dirty_key(kind: TargetKind) -> String {
    format!("{DIRTY_PREFIX}{kind}")
}

/// Task bodies of a queue, by task id
#[must_use]
pub fn queue_tasks_key(queue: &str) -> String {
    format!("{QUEUE_PREFIX}{queue}:tasks")
}

/// Pending task ids of a queue (LPUSH in, RPOP out)
#[must_use]
pub fn queue_pending_key(queue: &str) -> String {
    format!("{QUEUE_PREFIX}{queue}:pending")
}

/// Checked-out task ids of a queue
#[must_use]
pub fn queue_active_key(queue: &str) -> String {
    format!("{QUEUE_PREFIX}{queue}:active")
}

/// Task ids waiting for a retry, scored by due time in milliseconds
#[must_use]
pub fn queue_retry_key(queue: &str) -> String {
    format!("{QUEUE_PREFIX}{queue}:retry")
}

/// Archived task bodies of a queue
#[must_use]
pub fn queue_archived_key(queue: &str) -> String {
    format!("{QUEUE_PREFIX}{queue}:archived")
}

/// Claim marker for one tick of a schedule
#[must_use]
pub fn tick_key(schedule_id: &str, tick: DateTime<Utc>) -> String {
    format!("{TICK_PREFIX}{schedule_id}:{}", tick.timestamp())
}
