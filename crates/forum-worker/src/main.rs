//! Interaction worker entry point
//!
//! Run with:
//! ```bash
//! cargo run -p forum-worker
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`). Set
//! `DATABASE_MIGRATIONS_DIR=crates/forum-db/migrations` to apply the schema on
//! startup.

use anyhow::Context;
use forum_cache::{RedisPool, RedisStatsCache, RedisTaskBroker};
use forum_common::{try_init_tracing_with_config, AppConfig, ConfigError, TracingConfig};
use forum_core::TaskBroker;
use forum_db::{
    create_pool, run_migrations, DatabaseConfig, PgActionRepository, PgTargetRepository,
};
use forum_service::ServiceContext;
use forum_worker::{
    EnqueueOptions, Schedule, SyncHandler, SyncPayload, TaskClient, Worker, WorkerOptions,
    SYNC_JOB_TYPE,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Worker failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!("Starting interaction worker...");

    let schedule: Schedule = config
        .sync
        .schedule
        .parse()
        .map_err(|_| ConfigError::InvalidValue("SYNC_SCHEDULE", config.sync.schedule.clone()))?;

    info!(
        env = ?config.app.env,
        schedule = %config.sync.schedule,
        period_secs = schedule.period().as_secs(),
        concurrency = config.worker.concurrency,
        "Configuration loaded"
    );

    let pg = create_pool(&DatabaseConfig::from(&config.database))
        .await
        .context("Failed to connect to PostgreSQL")?;
    if let Some(dir) = &config.database.migrations_dir {
        run_migrations(&pg, Path::new(dir))
            .await
            .with_context(|| format!("Failed to apply migrations from {dir}"))?;
        info!(dir = %dir, "Database migrations applied");
    }
    let redis = RedisPool::from_config(&config.redis).context("Failed to create Redis pool")?;
    redis
        .health_check()
        .await
        .context("Redis health check failed")?;

    let ctx = Arc::new(ServiceContext::new(
        Arc::new(PgTargetRepository::new(pg.clone())),
        Arc::new(PgActionRepository::new(pg)),
        Arc::new(RedisStatsCache::new(redis.clone())),
    ));
    let broker: Arc<dyn TaskBroker> = Arc::new(RedisTaskBroker::new(redis));

    let client = TaskClient::new(broker.clone());
    let options = EnqueueOptions::from(&config.sync);
    let schedule_id = client
        .register_schedule(&config.sync.schedule, SYNC_JOB_TYPE, &SyncPayload::all(), options.clone())
        .await?;
    info!(schedule_id = %schedule_id, "Sync schedule registered");

    if config.sync.on_startup {
        client
            .enqueue(SYNC_JOB_TYPE, &SyncPayload::all(), options.clone())
            .await?;
    }

    let mut worker = Worker::new(broker);
    worker.register_handler(
        SYNC_JOB_TYPE,
        Arc::new(SyncHandler::new(ctx, config.sync.batch_size)),
    );

    let worker_options = WorkerOptions::from(&config.worker).with_queues([options.queue]);
    let shutdown_timeout = worker_options.shutdown_timeout;
    let handle = worker.start(worker_options).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // In-flight tasks get shutdown_timeout; the margin is for the scheduler loop.
    handle
        .shutdown(shutdown_timeout + Duration::from_secs(5))
        .await?;

    info!("Interaction worker stopped");
    Ok(())
}
