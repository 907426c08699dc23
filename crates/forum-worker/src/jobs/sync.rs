//! `interaction:sync` - counter reconciliation as a queued task

use async_trait::async_trait;
use forum_common::AppError;
use forum_core::{TargetKind, TargetPolicy, TaskMessage};
use forum_service::{ServiceContext, ServiceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::worker::{HandlerError, TaskHandler};

/// Job type bound to [`SyncHandler`]
pub const SYNC_JOB_TYPE: &str = "interaction:sync";

/// Sync task payload; no target kind means every kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub target_kind: Option<TargetKind>,
}

impl SyncPayload {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only(kind: TargetKind) -> Self {
        Self {
            target_kind: Some(kind),
        }
    }

    /// Decode a task payload; `null` is accepted as "every kind"
    pub fn from_task(task: &TaskMessage) -> Result<Self, serde_json::Error> {
        if task.payload.is_null() {
            return Ok(Self::all());
        }
        serde_json::from_value(task.payload.clone())
    }
}

/// Runs the reconciliation job for sync tasks
pub struct SyncHandler {
    ctx: Arc<ServiceContext>,
    batch_size: usize,
}

impl SyncHandler {
    pub fn new(ctx: Arc<ServiceContext>, batch_size: usize) -> Self {
        Self { ctx, batch_size }
    }
}

#[async_trait]
impl TaskHandler for SyncHandler {
    async fn handle(&self, task: &TaskMessage) -> Result<(), HandlerError> {
        let payload = SyncPayload::from_task(task)
            .map_err(|e| HandlerError::skip_retry(format!("invalid sync payload: {e}")))?;

        let sync = self.ctx.sync().with_batch_size(self.batch_size);
        let report = match payload.target_kind {
            Some(kind) => sync.sync_target_kind(TargetPolicy::for_kind(kind)).await,
            None => sync.sync_all().await,
        }
        .map_err(failure)?;

        info!(
            task_id = %task.id,
            synced = report.synced,
            tombstoned = report.tombstoned,
            failed = report.failed,
            "Sync task finished"
        );
        Ok(())
    }
}

/// Client-class failures will not succeed on a retry
fn failure(err: ServiceError) -> HandlerError {
    let err = AppError::from(err);
    if err.is_client_error() {
        HandlerError::skip_retry(err.to_string())
    } else {
        HandlerError::retry(err.to_string())
    }
}
