//! Dequeue loop, task execution, and shutdown

use chrono::Utc;
use forum_common::WorkerConfig;
use forum_core::{TaskBroker, TaskMessage};
use futures::FutureExt;
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::handler::{FnHandler, HandlerError, TaskHandler};
use super::runner::ScheduleRunner;
use crate::error::{WorkerError, WorkerResult};

/// Worker runtime options
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Queues polled, in priority order
    pub queues: Vec<String>,
    /// Maximum number of tasks in flight
    pub concurrency: usize,
    /// Sleep between polls when every queue is empty
    pub poll_interval: Duration,
    /// Time allowed for in-flight tasks once shutdown is requested
    pub shutdown_timeout: Duration,
    /// Timeout for tasks without their own override
    pub default_task_timeout: Duration,
    /// First retry delay; doubles per retry
    pub retry_base: Duration,
    /// Upper bound on the retry delay
    pub retry_max: Duration,
    /// How often schedules are checked for due ticks
    pub schedule_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            queues: vec!["default".to_string()],
            concurrency: config.concurrency.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            default_task_timeout: Duration::from_secs(1800),
            retry_base: Duration::from_secs(10),
            retry_max: Duration::from_secs(600),
            schedule_interval: Duration::from_secs(1),
        }
    }
}

impl WorkerOptions {
    /// Replace the polled queues
    #[must_use]
    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }
}

/// Delay before retry number `retried` (1-based): `base * 2^(retried - 1)`,
/// capped at `max`, plus up to 10% jitter.
#[must_use]
pub fn retry_delay(retried: u32, base: Duration, max: Duration) -> Duration {
    let exponent = retried.saturating_sub(1).min(16);
    let delay = base.saturating_mul(1 << exponent).min(max);
    let jitter_ms = u64::try_from(delay.as_millis() / 10).unwrap_or(u64::MAX);
    let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
    delay.saturating_add(Duration::from_millis(jitter))
}

type Handlers = HashMap<String, Arc<dyn TaskHandler>>;

/// Consumer side of the task queue
pub struct Worker {
    broker: Arc<dyn TaskBroker>,
    handlers: Handlers,
}

impl Worker {
    pub fn new(broker: Arc<dyn TaskBroker>) -> Self {
        Self {
            broker,
            handlers: HashMap::new(),
        }
    }

    /// Bind a handler to a job type, replacing any previous binding
    pub fn register_handler(&mut self, job_type: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(job_type.into(), handler);
    }

    /// Bind an async closure to a job type
    pub fn register_handler_fn<F, Fut>(&mut self, job_type: impl Into<String>, f: F)
    where
        F: Fn(TaskMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register_handler(job_type, Arc::new(FnHandler::new(f)));
    }

    /// Re-queue tasks stranded in `active` by a previous run, then start the
    /// dequeue and schedule loops.
    pub async fn start(self, options: WorkerOptions) -> WorkerResult<WorkerHandle> {
        for queue in &options.queues {
            let requeued = self.broker.requeue_active(queue).await?;
            if requeued > 0 {
                warn!(queue = %queue, requeued, "Re-queued tasks left active by a previous worker");
            }
        }

        info!(
            queues = ?options.queues,
            concurrency = options.concurrency,
            handlers = self.handlers.len(),
            "Worker started"
        );

        let processor_stop = Arc::new(Notify::new());
        let scheduler_stop = Arc::new(Notify::new());

        let processor = Processor {
            broker: self.broker.clone(),
            handlers: Arc::new(self.handlers),
            options: options.clone(),
        };
        let processor_task = tokio::spawn(processor.run(processor_stop.clone()));
        let scheduler_task = tokio::spawn(run_schedules(
            ScheduleRunner::new(self.broker),
            options.schedule_interval,
            scheduler_stop.clone(),
        ));

        Ok(WorkerHandle {
            processor_stop,
            scheduler_stop,
            processor_task,
            scheduler_task,
        })
    }
}

/// Handle to a running worker
pub struct WorkerHandle {
    processor_stop: Arc<Notify>,
    scheduler_stop: Arc<Notify>,
    processor_task: JoinHandle<WorkerResult<()>>,
    scheduler_task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop both loops and wait for in-flight tasks, up to `timeout`.
    ///
    /// Tasks still running past the worker's own shutdown timeout are
    /// abandoned in `active` and re-queued by the next `start`.
    pub async fn shutdown(self, timeout: Duration) -> WorkerResult<()> {
        let Self {
            processor_stop,
            scheduler_stop,
            processor_task,
            scheduler_task,
        } = self;

        scheduler_stop.notify_one();
        processor_stop.notify_one();

        tokio::time::timeout(timeout, async move {
            scheduler_task.await?;
            processor_task.await?
        })
        .await
        .map_err(|_| WorkerError::ShutdownTimeout)?
    }
}

struct Processor {
    broker: Arc<dyn TaskBroker>,
    handlers: Arc<Handlers>,
    options: WorkerOptions,
}

impl Processor {
    async fn run(self, stop: Arc<Notify>) -> WorkerResult<()> {
        let mut in_flight = JoinSet::new();

        loop {
            if in_flight.len() < self.options.concurrency {
                match self.next_task().await {
                    Ok(Some(task)) => {
                        let handler = self.handlers.get(&task.job_type).cloned();
                        in_flight.spawn(execute(
                            self.broker.clone(),
                            handler,
                            task,
                            self.options.clone(),
                        ));
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "Queue poll failed"),
                }
            }

            tokio::select! {
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Task execution aborted");
                    }
                }
                () = tokio::time::sleep(self.options.poll_interval) => {}
                () = stop.notified() => break,
            }
        }

        info!(in_flight = in_flight.len(), "Worker stopping, waiting for in-flight tasks");
        let drained = tokio::time::timeout(self.options.shutdown_timeout, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(abandoned = in_flight.len(), "Shutdown timeout elapsed, abandoning tasks");
            in_flight.abort_all();
            return Err(WorkerError::ShutdownTimeout);
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Promote due retries and pop from the first non-empty queue
    async fn next_task(&self) -> WorkerResult<Option<TaskMessage>> {
        for queue in &self.options.queues {
            let promoted = self.broker.promote_due(queue, Utc::now()).await?;
            if promoted > 0 {
                debug!(queue = %queue, promoted, "Promoted due retries");
            }
            if let Some(task) = self.broker.pop(queue).await? {
                return Ok(Some(task));
            }
        }
        Ok(None)
    }
}

/// Run one task and report the outcome to the broker
#[instrument(skip_all, fields(task_id = %task.id, job_type = %task.job_type))]
async fn execute(
    broker: Arc<dyn TaskBroker>,
    handler: Option<Arc<dyn TaskHandler>>,
    task: TaskMessage,
    options: WorkerOptions,
) {
    let Some(handler) = handler else {
        settle(
            broker.as_ref(),
            task,
            Err(HandlerError::skip_retry("no handler registered for job type")),
            &options,
        )
        .await;
        return;
    };

    let timeout = task
        .timeout_secs
        .map_or(options.default_task_timeout, Duration::from_secs);

    let outcome = match tokio::time::timeout(
        timeout,
        AssertUnwindSafe(handler.handle(&task)).catch_unwind(),
    )
    .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(HandlerError::retry("handler panicked")),
        Err(_) => Err(HandlerError::retry(format!("timed out after {timeout:?}"))),
    };

    settle(broker.as_ref(), task, outcome, &options).await;
}

async fn settle(
    broker: &dyn TaskBroker,
    mut task: TaskMessage,
    outcome: Result<(), HandlerError>,
    options: &WorkerOptions,
) {
    let reported = match outcome {
        Ok(()) => {
            debug!("Task completed");
            broker.ack(&task).await
        }
        Err(HandlerError::Retry(msg)) if task.can_retry() => {
            task.retried += 1;
            let delay = retry_delay(task.retried, options.retry_base, options.retry_max);
            warn!(retried = task.retried, max_retry = task.max_retry, delay_ms = delay.as_millis(), error = %msg, "Task failed, retrying");
            task.last_error = Some(msg);
            let process_at = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            broker.retry(&task, process_at).await
        }
        Err(HandlerError::Retry(msg) | HandlerError::SkipRetry(msg)) => {
            error!(retried = task.retried, error = %msg, "Task failed, archiving");
            task.last_error = Some(msg);
            broker.archive(&task).await
        }
    };

    if let Err(e) = reported {
        error!(error = %e, "Could not report task outcome, task stays active");
    }
}

async fn run_schedules(mut runner: ScheduleRunner, every: Duration, stop: Arc<Notify>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = runner.run_due(Utc::now()).await {
                    warn!(error = %e, "Schedule evaluation failed");
                }
            }
            () = stop.notified() => break,
        }
    }

    debug!("Scheduler stopped");
}
