//! Mutex-guarded `TaskBroker`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use forum_core::{RepoResult, ScheduleEntry, TaskBroker, TaskMessage};

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<TaskMessage>,
    active: HashMap<String, TaskMessage>,
    retry: Vec<(DateTime<Utc>, TaskMessage)>,
    archived: Vec<TaskMessage>,
    completed: Vec<TaskMessage>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, Queue>,
    schedules: HashMap<String, ScheduleEntry>,
    claims: HashSet<(String, i64)>,
}

impl State {
    fn queue(&mut self, name: &str) -> &mut Queue {
        self.queues.entry(name.to_string()).or_default()
    }
}

/// In-process task broker with the same state transitions as the Redis one.
///
/// Also records acknowledged tasks so tests can assert on outcomes.
#[derive(Debug, Default)]
pub struct InMemoryTaskBroker {
    state: Mutex<State>,
}

impl InMemoryTaskBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending(&self, queue: &str) -> Vec<TaskMessage> {
        let state = self.state.lock();
        state
            .queues
            .get(queue)
            .map(|q| q.pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_len(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, |q| q.active.len())
    }

    #[must_use]
    pub fn retry_len(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, |q| q.retry.len())
    }

    #[must_use]
    pub fn archived(&self, queue: &str) -> Vec<TaskMessage> {
        self.state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.archived.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn completed(&self, queue: &str) -> Vec<TaskMessage> {
        self.state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.completed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskBroker for InMemoryTaskBroker {
    async fn push(&self, task: &TaskMessage) -> RepoResult<()> {
        self.state.lock().queue(&task.queue).pending.push_back(task.clone());
        Ok(())
    }

    async fn pop(&self, queue: &str) -> RepoResult<Option<TaskMessage>> {
        let mut state = self.state.lock();
        let queue = state.queue(queue);
        let task = queue.pending.pop_front();
        if let Some(task) = &task {
            queue.active.insert(task.id.clone(), task.clone());
        }
        Ok(task)
    }

    async fn ack(&self, task: &TaskMessage) -> RepoResult<()> {
        let mut state = self.state.lock();
        let queue = state.queue(&task.queue);
        queue.active.remove(&task.id);
        queue.completed.push(task.clone());
        Ok(())
    }

    async fn retry(&self, task: &TaskMessage, process_at: DateTime<Utc>) -> RepoResult<()> {
        let mut state = self.state.lock();
        let queue = state.queue(&task.queue);
        queue.active.remove(&task.id);
        queue.retry.push((process_at, task.clone()));
        Ok(())
    }

    async fn archive(&self, task: &TaskMessage) -> RepoResult<()> {
        let mut state = self.state.lock();
        let queue = state.queue(&task.queue);
        queue.active.remove(&task.id);
        queue.archived.push(task.clone());
        Ok(())
    }

    async fn promote_due(&self, queue: &str, now: DateTime<Utc>) -> RepoResult<usize> {
        let mut state = self.state.lock();
        let queue = state.queue(queue);
        let (due, waiting): (Vec<_>, Vec<_>) =
            queue.retry.drain(..).partition(|(at, _)| *at <= now);
        queue.retry = waiting;
        let moved = due.len();
        queue.pending.extend(due.into_iter().map(|(_, task)| task));
        Ok(moved)
    }

    async fn requeue_active(&self, queue: &str) -> RepoResult<usize> {
        let mut state = self.state.lock();
        let queue = state.queue(queue);
        let moved = queue.active.len();
        let stranded: Vec<TaskMessage> = queue.active.drain().map(|(_, task)| task).collect();
        for task in stranded {
            queue.pending.push_front(task);
        }
        Ok(moved)
    }

    async fn save_schedule(&self, entry: &ScheduleEntry) -> RepoResult<()> {
        self.state
            .lock()
            .schedules
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn schedules(&self) -> RepoResult<Vec<ScheduleEntry>> {
        let mut entries: Vec<ScheduleEntry> =
            self.state.lock().schedules.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn claim_tick(&self, schedule_id: &str, tick: DateTime<Utc>) -> RepoResult<bool> {
        Ok(self
            .state
            .lock()
            .claims
            .insert((schedule_id.to_string(), tick.timestamp())))
    }
}
