//! Counter reconciliation
//!
//! Re-derives like, dislike, and favorite counts from the ledger for every
//! dirty target, persists them with the cached view count, and refreshes the
//! cache. Each run recounts from scratch, so overlapping runs are harmless.

use forum_cache::keys;
use forum_core::entities::{CounterField, CounterSnapshot, TargetPolicy};
use forum_core::Id;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::{debug, error, info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Dirty ids processed per batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Outcome counts of one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Targets whose snapshot was rewritten
    pub synced: usize,
    /// Targets that no longer exist and were dropped from the cache
    pub tombstoned: usize,
    /// Targets left dirty after an error
    pub failed: usize,
}

impl SyncReport {
    /// Dirty ids examined
    #[must_use]
    pub fn total(&self) -> usize {
        self.synced + self.tombstoned + self.failed
    }
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.synced += other.synced;
        self.tombstoned += other.tombstoned;
        self.failed += other.failed;
    }
}

enum EntryOutcome {
    Synced,
    Tombstoned,
}

/// Reconciliation job
pub struct SyncService<'a> {
    ctx: &'a ServiceContext,
    batch_size: usize,
}

impl<'a> SyncService<'a> {
    /// Create a new SyncService with the default batch size
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self {
            ctx,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size; zero is treated as one
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Reconcile posts, then comments
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> ServiceResult<SyncReport> {
        let mut report = self.sync_target_kind(TargetPolicy::POST).await?;
        report += self.sync_target_kind(TargetPolicy::COMMENT).await?;
        Ok(report)
    }

    /// Reconcile every dirty target of one kind.
    ///
    /// Fails only when the dirty set cannot be read; per-target errors are
    /// logged and counted in `SyncReport::failed`.
    #[instrument(skip(self, policy), fields(target_kind = %policy.kind))]
    pub async fn sync_target_kind(&self, policy: TargetPolicy) -> ServiceResult<SyncReport> {
        let dirty_key = keys::dirty_key(policy.kind);
        let ids = self.ctx.stats_cache().drain_dirty(&dirty_key).await?;

        let mut report = SyncReport::default();
        if ids.is_empty() {
            debug!("Nothing to reconcile");
            return Ok(report);
        }

        for batch in ids.chunks(self.batch_size) {
            let mut done = Vec::with_capacity(batch.len());

            for &target_id in batch {
                match self.sync_one(policy, target_id).await {
                    Ok(EntryOutcome::Synced) => {
                        report.synced += 1;
                        done.push(target_id);
                    }
                    Ok(EntryOutcome::Tombstoned) => {
                        report.tombstoned += 1;
                        done.push(target_id);
                    }
                    Err(e) => {
                        error!(target_id = %target_id, error = %e, "Reconciliation failed, target stays dirty");
                        report.failed += 1;
                    }
                }
            }

            if let Err(e) = self
                .ctx
                .stats_cache()
                .remove_dirty(&dirty_key, &done)
                .await
            {
                warn!(error = %e, "Could not clear reconciled ids from dirty set");
            }
        }

        info!(
            synced = report.synced,
            tombstoned = report.tombstoned,
            failed = report.failed,
            "Reconciliation finished"
        );

        Ok(report)
    }

    async fn sync_one(&self, policy: TargetPolicy, target_id: Id) -> ServiceResult<EntryOutcome> {
        let kind = policy.kind;
        let actions = self.ctx.action_repo();
        let stats_key = keys::stats_key(kind, target_id);

        let mut snapshot = CounterSnapshot::default();
        for action in policy.actions {
            let count = actions.count(kind, target_id, *action).await?;
            snapshot.set(CounterField::from(*action), count);
        }

        if policy.counts_views {
            snapshot.view_count = self.resolve_views(policy, target_id, &stats_key).await?;
        }

        match self
            .ctx
            .target_repo()
            .upsert_snapshot(kind, target_id, &snapshot)
            .await
        {
            Ok(()) => {
                if let Err(e) = self
                    .ctx
                    .stats_cache()
                    .set_fields(&stats_key, &snapshot.to_fields())
                    .await
                {
                    warn!(target_id = %target_id, error = %e, "Could not refresh cached stats");
                }
                Ok(EntryOutcome::Synced)
            }
            Err(e) if e.is_not_found() => {
                warn!(target_id = %target_id, "Target no longer exists, dropping cached stats");
                if let Err(e) = self.ctx.stats_cache().delete(&stats_key).await {
                    warn!(target_id = %target_id, error = %e, "Could not drop cached stats");
                }
                Ok(EntryOutcome::Tombstoned)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cached view count, or the persisted one when the cache has none
    async fn resolve_views(
        &self,
        policy: TargetPolicy,
        target_id: Id,
        stats_key: &str,
    ) -> ServiceResult<i64> {
        let field = CounterField::View.as_str();
        match self.ctx.stats_cache().get_fields(stats_key, &[field]).await {
            Ok(fields) => {
                if let Some(views) = fields.get(field) {
                    return Ok((*views).max(0));
                }
            }
            Err(e) => warn!(target_id = %target_id, error = %e, "View count unreadable, using persisted value"),
        }

        let persisted = self
            .ctx
            .target_repo()
            .read_snapshot(policy.kind, target_id)
            .await?;
        Ok(persisted.map_or(0, |s| s.view_count))
    }
}
