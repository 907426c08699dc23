//! Task scheduler tests
//!
//! Run with: cargo test -p integration-tests --test worker_tests

use forum_cache::InMemoryTaskBroker;
use forum_core::{ActionKind, Id, TargetKind, TaskBroker};
use forum_worker::{
    EnqueueOptions, HandlerError, SyncHandler, SyncPayload, TaskClient, Worker, WorkerError,
    WorkerOptions, SYNC_JOB_TYPE,
};
use integration_tests::{wait_until, TestEngine};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const QUEUE: &str = "default";
const WAIT: Duration = Duration::from_secs(5);

fn fast_options() -> WorkerOptions {
    WorkerOptions {
        poll_interval: Duration::from_millis(10),
        shutdown_timeout: Duration::from_secs(2),
        default_task_timeout: Duration::from_secs(2),
        retry_base: Duration::ZERO,
        retry_max: Duration::ZERO,
        schedule_interval: Duration::from_millis(20),
        ..WorkerOptions::default()
    }
}

fn with_retries(max_retry: u32) -> EnqueueOptions {
    EnqueueOptions {
        max_retry,
        ..EnqueueOptions::default()
    }
}

/// Worker whose `job` handler counts attempts and answers with `outcome`
fn counting_worker(
    broker: Arc<InMemoryTaskBroker>,
    outcome: Result<(), HandlerError>,
) -> (Worker, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut worker = Worker::new(broker);
    let counter = attempts.clone();
    worker.register_handler_fn("job", move |_task| {
        let counter = counter.clone();
        let outcome = outcome.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            outcome
        }
    });
    (worker, attempts)
}

// ============================================================================
// Outcomes
// ============================================================================

#[tokio::test]
async fn test_successful_task_is_acked() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let (worker, attempts) = counting_worker(broker.clone(), Ok(()));

    let id = client
        .enqueue("job", &json!({"n": 1}), EnqueueOptions::default())
        .await
        .unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.completed(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(broker.completed(QUEUE)[0].id, id);
    assert_eq!(broker.active_len(QUEUE), 0);
}

#[tokio::test]
async fn test_failing_task_is_retried_then_archived() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let (worker, attempts) = counting_worker(broker.clone(), Err(HandlerError::retry("boom")));

    client.enqueue("job", &json!(null), with_retries(2)).await.unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let archived = &broker.archived(QUEUE)[0];
    assert_eq!(archived.retried, 2);
    assert_eq!(archived.last_error.as_deref(), Some("boom"));
    assert!(broker.completed(QUEUE).is_empty());
    assert_eq!(broker.retry_len(QUEUE), 0);
}

#[tokio::test]
async fn test_skip_retry_archives_immediately() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let (worker, attempts) =
        counting_worker(broker.clone(), Err(HandlerError::skip_retry("bad payload")));

    client.enqueue("job", &json!(null), with_retries(5)).await.unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(broker.archived(QUEUE)[0].retried, 0);
}

#[tokio::test]
async fn test_unknown_job_type_is_archived() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let (worker, attempts) = counting_worker(broker.clone(), Ok(()));

    client.enqueue("missing", &json!(null), with_retries(3)).await.unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 0);
    assert_eq!(broker.archived(QUEUE)[0].job_type, "missing");
}

#[tokio::test]
async fn test_slow_task_times_out() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let mut worker = Worker::new(broker.clone());
    worker.register_handler_fn("slow", |_task| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    });

    client.enqueue("slow", &json!(null), with_retries(0)).await.unwrap();
    let options = WorkerOptions {
        default_task_timeout: Duration::from_millis(50),
        ..fast_options()
    };
    let handle = worker.start(options).await.unwrap();

    assert!(wait_until(WAIT, || broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    let error = broker.archived(QUEUE)[0].last_error.clone().unwrap();
    assert!(error.starts_with("timed out"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_panicking_handler_counts_as_failure() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let mut worker = Worker::new(broker.clone());
    worker.register_handler_fn("explode", |task| async move {
        if task.payload.is_null() {
            panic!("handler bug");
        }
        Ok(())
    });

    client.enqueue("explode", &json!(null), with_retries(1)).await.unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    let archived = &broker.archived(QUEUE)[0];
    assert_eq!(archived.retried, 1);
    assert_eq!(archived.last_error.as_deref(), Some("handler panicked"));
}

// ============================================================================
// Runtime
// ============================================================================

#[tokio::test]
async fn test_tasks_left_active_are_requeued_on_start() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    client.enqueue("job", &json!(null), EnqueueOptions::default()).await.unwrap();

    // A previous worker checked the task out and died.
    broker.pop(QUEUE).await.unwrap().unwrap();
    assert_eq!(broker.active_len(QUEUE), 1);

    let (worker, attempts) = counting_worker(broker.clone(), Ok(()));
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.completed(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut worker = Worker::new(broker.clone());
    {
        let running = running.clone();
        let peak = peak.clone();
        worker.register_handler_fn("job", move |_task| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });
    }

    for n in 0..6 {
        client.enqueue("job", &json!({ "n": n }), EnqueueOptions::default()).await.unwrap();
    }
    let options = WorkerOptions {
        concurrency: 2,
        ..fast_options()
    };
    let handle = worker.start(options).await.unwrap();

    assert!(wait_until(WAIT, || broker.completed(QUEUE).len() == 6).await);
    handle.shutdown(WAIT).await.unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_tasks() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    let mut worker = Worker::new(broker.clone());
    worker.register_handler_fn("job", |_task| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    });

    client.enqueue("job", &json!(null), EnqueueOptions::default()).await.unwrap();
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || broker.active_len(QUEUE) == 1).await);
    handle.shutdown(WAIT).await.unwrap();
    assert_eq!(broker.completed(QUEUE).len(), 1);
}

// ============================================================================
// Schedules
// ============================================================================

#[tokio::test]
async fn test_schedule_registration_is_idempotent() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());

    let first = client
        .register_schedule("@every 5m", SYNC_JOB_TYPE, &SyncPayload::all(), EnqueueOptions::default())
        .await
        .unwrap();
    let second = client
        .register_schedule("@every 5m", SYNC_JOB_TYPE, &SyncPayload::all(), EnqueueOptions::default())
        .await
        .unwrap();
    let posts_only = client
        .register_schedule(
            "@every 5m",
            SYNC_JOB_TYPE,
            &SyncPayload::only(TargetKind::Post),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_ne!(first, posts_only);
    assert_eq!(broker.schedules().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_schedule_is_rejected() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());

    let err = client
        .register_schedule("every five minutes", SYNC_JOB_TYPE, &SyncPayload::all(), EnqueueOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Schedule(_)));
    assert!(broker.schedules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_running_worker_enqueues_schedule_ticks() {
    let broker = Arc::new(InMemoryTaskBroker::new());
    let client = TaskClient::new(broker.clone());
    client
        .register_schedule("@every 1s", "job", &json!(null), EnqueueOptions::default())
        .await
        .unwrap();

    let (worker, attempts) = counting_worker(broker.clone(), Ok(()));
    let handle = worker.start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || !broker.completed(QUEUE).is_empty()).await);
    handle.shutdown(WAIT).await.unwrap();
    assert!(attempts.load(Ordering::SeqCst) >= 1);
}

// ============================================================================
// Reconciliation job
// ============================================================================

fn sync_worker(engine: &TestEngine) -> Worker {
    let mut worker = Worker::new(engine.broker.clone());
    worker.register_handler(
        SYNC_JOB_TYPE,
        Arc::new(SyncHandler::new(engine.ctx.clone(), 10)),
    );
    worker
}

#[tokio::test]
async fn test_sync_task_reconciles_counters() {
    let engine = TestEngine::new().with_post(7).with_comment(5);
    engine
        .ctx
        .posts()
        .perform_action(Id::new(1), Id::new(7), ActionKind::Like)
        .await
        .unwrap();
    engine
        .ctx
        .comments()
        .perform_action(Id::new(1), Id::new(5), ActionKind::Dislike)
        .await
        .unwrap();

    let client = TaskClient::new(engine.broker.clone());
    client
        .enqueue(SYNC_JOB_TYPE, &SyncPayload::only(TargetKind::Post), EnqueueOptions::default())
        .await
        .unwrap();
    let handle = sync_worker(&engine).start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || engine.broker.completed(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    assert_eq!(engine.targets.stored(TargetKind::Post, 7).unwrap().like_count, 1);
    assert_eq!(engine.targets.stored(TargetKind::Comment, 5).unwrap().dislike_count, 0);
}

#[tokio::test]
async fn test_null_sync_payload_covers_every_kind() {
    let engine = TestEngine::new().with_comment(5);
    engine
        .ctx
        .comments()
        .perform_action(Id::new(1), Id::new(5), ActionKind::Like)
        .await
        .unwrap();

    TaskClient::new(engine.broker.clone())
        .enqueue(SYNC_JOB_TYPE, &json!(null), EnqueueOptions::default())
        .await
        .unwrap();
    let handle = sync_worker(&engine).start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || engine.broker.completed(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();
    assert_eq!(engine.targets.stored(TargetKind::Comment, 5).unwrap().like_count, 1);
}

#[tokio::test]
async fn test_malformed_sync_payload_is_not_retried() {
    let engine = TestEngine::new();
    TaskClient::new(engine.broker.clone())
        .enqueue(SYNC_JOB_TYPE, &json!({"target_kind": "thread"}), with_retries(3))
        .await
        .unwrap();
    let handle = sync_worker(&engine).start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || engine.broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();

    let archived = &engine.broker.archived(QUEUE)[0];
    assert_eq!(archived.retried, 0);
    assert!(archived
        .last_error
        .as_deref()
        .is_some_and(|e| e.starts_with("invalid sync payload")));
}

#[tokio::test]
async fn test_sync_failure_is_retried() {
    let engine = TestEngine::new();
    engine.cache.set_unavailable(true);
    TaskClient::new(engine.broker.clone())
        .enqueue(SYNC_JOB_TYPE, &SyncPayload::all(), with_retries(1))
        .await
        .unwrap();
    let handle = sync_worker(&engine).start(fast_options()).await.unwrap();

    assert!(wait_until(WAIT, || engine.broker.archived(QUEUE).len() == 1).await);
    handle.shutdown(WAIT).await.unwrap();
    assert_eq!(engine.broker.archived(QUEUE)[0].retried, 1);
}
