//! Due-tick evaluation for persisted schedules

use chrono::{DateTime, Utc};
use forum_core::{ScheduleEntry, TaskBroker, TaskMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WorkerResult;
use crate::schedule::Schedule;

/// Turns schedule ticks into tasks.
///
/// Each tick of a schedule is claimed on the broker before its task is
/// pushed, so any number of workers produce exactly one task per tick. The
/// tick that is current when a schedule is first observed is not run.
pub struct ScheduleRunner {
    broker: Arc<dyn TaskBroker>,
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl ScheduleRunner {
    pub fn new(broker: Arc<dyn TaskBroker>) -> Self {
        Self {
            broker,
            last_seen: HashMap::new(),
        }
    }

    /// Enqueue a task for every schedule with a new tick at `now`.
    ///
    /// Returns the number of tasks enqueued by this runner.
    pub async fn run_due(&mut self, now: DateTime<Utc>) -> WorkerResult<usize> {
        let entries = self.broker.schedules().await?;
        let mut enqueued = 0;

        for entry in entries {
            let schedule = match Schedule::parse(&entry.spec) {
                Ok(schedule) => schedule,
                Err(e) => {
                    warn!(schedule_id = %entry.id, error = %e, "Skipping unparsable schedule");
                    continue;
                }
            };

            let tick = schedule.last_tick(now);
            let Some(previous) = self.last_seen.insert(entry.id.clone(), tick) else {
                debug!(schedule_id = %entry.id, next = %schedule.next_tick(now), "Schedule observed");
                continue;
            };
            if tick <= previous {
                continue;
            }

            if !self.broker.claim_tick(&entry.id, tick).await? {
                debug!(schedule_id = %entry.id, tick = %tick, "Tick claimed elsewhere");
                continue;
            }

            let task = task_for(&entry, now);
            self.broker.push(&task).await?;
            info!(schedule_id = %entry.id, task_id = %task.id, tick = %tick, "Scheduled task enqueued");
            enqueued += 1;
        }

        Ok(enqueued)
    }
}

fn task_for(entry: &ScheduleEntry, now: DateTime<Utc>) -> TaskMessage {
    TaskMessage {
        id: Uuid::new_v4().to_string(),
        job_type: entry.job_type.clone(),
        payload: entry.payload.clone(),
        queue: entry.queue.clone(),
        max_retry: entry.max_retry,
        retried: 0,
        timeout_secs: entry.timeout_secs,
        last_error: None,
        enqueued_at: now,
    }
}
