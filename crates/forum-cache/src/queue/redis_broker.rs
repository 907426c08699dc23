//! Redis implementation of the `TaskBroker` port.
//!
//! Per queue:
//! - `queue:{q}:tasks` hash, task id -> JSON body of every live task
//! - `queue:{q}:pending` list of ids (LPUSH in, RPOP out)
//! - `queue:{q}:active` set of checked-out ids
//! - `queue:{q}:retry` sorted set of ids scored by due time (ms)
//! - `queue:{q}:archived` capped list of archived JSON bodies
//!
//! Moves between structures that must not be observed half-done run as Lua
//! scripts or MULTI pipelines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};
use tracing::{debug, instrument};

use forum_core::{RepoResult, ScheduleEntry, TaskBroker, TaskMessage};

use crate::keys::{
    queue_active_key, queue_archived_key, queue_pending_key, queue_retry_key, queue_tasks_key,
    tick_key, SCHEDULES_KEY,
};
use crate::pool::{unavailable, RedisPool};

/// Archived bodies kept per queue
pub const ARCHIVE_LIMIT: isize = 1000;
/// Lifetime of a schedule tick claim
pub const TICK_CLAIM_TTL_SECS: u64 = 86_400;

// KEYS: pending, active, tasks
const POP_SCRIPT: &str = r"
local id = redis.call('RPOP', KEYS[1])
if not id then return false end
local body = redis.call('HGET', KEYS[3], id)
if not body then return false end
redis.call('SADD', KEYS[2], id)
return body
";

// KEYS: retry, pending  ARGV: now (ms)
const PROMOTE_SCRIPT: &str = r"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
for _, id in ipairs(ids) do
  redis.call('ZREM', KEYS[1], id)
  redis.call('LPUSH', KEYS[2], id)
end
return #ids
";

// KEYS: active, pending
const REQUEUE_SCRIPT: &str = r"
local ids = redis.call('SMEMBERS', KEYS[1])
for _, id in ipairs(ids) do
  redis.call('SREM', KEYS[1], id)
  redis.call('RPUSH', KEYS[2], id)
end
return #ids
";

/// Task broker over the shared Redis pool
#[derive(Clone)]
pub struct RedisTaskBroker {
    pool: RedisPool,
    pop_script: Script,
    promote_script: Script,
    requeue_script: Script,
}

impl RedisTaskBroker {
    /// Create a new broker
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            pop_script: Script::new(POP_SCRIPT),
            promote_script: Script::new(PROMOTE_SCRIPT),
            requeue_script: Script::new(REQUEUE_SCRIPT),
        }
    }
}

#[async_trait]
impl TaskBroker for RedisTaskBroker {
    #[instrument(skip(self, task), fields(task_id = %task.id, queue = %task.queue))]
    async fn push(&self, task: &TaskMessage) -> RepoResult<()> {
        let body = serde_json::to_string(task).map_err(unavailable)?;
        let mut conn = self.pool.get().await.map_err(unavailable)?;

        let _: () = redis::pipe()
            .atomic()
            .hset(queue_tasks_key(&task.queue), &task.id, body)
            .ignore()
            .lpush(queue_pending_key(&task.queue), &task.id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn pop(&self, queue: &str) -> RepoResult<Option<TaskMessage>> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let body: Option<String> = self
            .pop_script
            .key(queue_pending_key(queue))
            .key(queue_active_key(queue))
            .key(queue_tasks_key(queue))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body).map_err(unavailable)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn ack(&self, task: &TaskMessage) -> RepoResult<()> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;

        let _: () = redis::pipe()
            .atomic()
            .srem(queue_active_key(&task.queue), &task.id)
            .ignore()
            .hdel(queue_tasks_key(&task.queue), &task.id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, retried = task.retried))]
    async fn retry(&self, task: &TaskMessage, process_at: DateTime<Utc>) -> RepoResult<()> {
        let body = serde_json::to_string(task).map_err(unavailable)?;
        let mut conn = self.pool.get().await.map_err(unavailable)?;

        let _: () = redis::pipe()
            .atomic()
            .srem(queue_active_key(&task.queue), &task.id)
            .ignore()
            .hset(queue_tasks_key(&task.queue), &task.id, body)
            .ignore()
            .zadd(
                queue_retry_key(&task.queue),
                &task.id,
                process_at.timestamp_millis(),
            )
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn archive(&self, task: &TaskMessage) -> RepoResult<()> {
        let body = serde_json::to_string(task).map_err(unavailable)?;
        let archived = queue_archived_key(&task.queue);
        let mut conn = self.pool.get().await.map_err(unavailable)?;

        let _: () = redis::pipe()
            .atomic()
            .srem(queue_active_key(&task.queue), &task.id)
            .ignore()
            .hdel(queue_tasks_key(&task.queue), &task.id)
            .ignore()
            .lpush(&archived, body)
            .ignore()
            .ltrim(&archived, 0, ARCHIVE_LIMIT - 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn promote_due(&self, queue: &str, now: DateTime<Utc>) -> RepoResult<usize> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let moved: usize = self
            .promote_script
            .key(queue_retry_key(queue))
            .key(queue_pending_key(queue))
            .arg(now.timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        if moved > 0 {
            debug!(moved, "Promoted due retries");
        }
        Ok(moved)
    }

    #[instrument(skip(self))]
    async fn requeue_active(&self, queue: &str) -> RepoResult<usize> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let moved: usize = self
            .requeue_script
            .key(queue_active_key(queue))
            .key(queue_pending_key(queue))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(moved)
    }

    #[instrument(skip(self, entry), fields(schedule_id = %entry.id, spec = %entry.spec))]
    async fn save_schedule(&self, entry: &ScheduleEntry) -> RepoResult<()> {
        let body = serde_json::to_string(entry).map_err(unavailable)?;
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.hset::<_, _, _, ()>(SCHEDULES_KEY, &entry.id, body)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn schedules(&self) -> RepoResult<Vec<ScheduleEntry>> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let bodies: Vec<String> = conn.hvals(SCHEDULES_KEY).await.map_err(unavailable)?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(unavailable))
            .collect()
    }

    #[instrument(skip(self))]
    async fn claim_tick(&self, schedule_id: &str, tick: DateTime<Utc>) -> RepoResult<bool> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let claimed: Option<String> = redis::cmd("SET")
            .arg(tick_key(schedule_id, tick))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(TICK_CLAIM_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(claimed.is_some())
    }
}
