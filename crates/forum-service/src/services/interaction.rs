//! Interaction service
//!
//! Coordinates like, dislike, favorite, and view actions on one target kind.
//! The ledger transaction is the only step that can fail a mutation; cache
//! updates after commit are best-effort and repaired by reconciliation.

use forum_cache::keys;
use forum_core::entities::{Action, CounterField, CounterSnapshot, TargetPolicy, UserActionStatus};
use forum_core::traits::RecordOutcome;
use forum_core::{ActionKind, CacheResult, DomainError, Id};
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Action coordinator for one target kind
pub struct InteractionService<'a> {
    ctx: &'a ServiceContext,
    policy: TargetPolicy,
}

impl<'a> InteractionService<'a> {
    /// Create a new InteractionService
    pub fn new(ctx: &'a ServiceContext, policy: TargetPolicy) -> Self {
        Self { ctx, policy }
    }

    /// The policy this coordinator enforces
    pub fn policy(&self) -> TargetPolicy {
        self.policy
    }

    /// Record an action and return the target's counters.
    ///
    /// Repeating an action the actor already holds is a no-op. Liking a
    /// target removes the actor's dislike and vice versa.
    #[instrument(skip(self), fields(target_kind = %self.policy.kind))]
    pub async fn perform_action(
        &self,
        actor_id: Id,
        target_id: Id,
        kind: ActionKind,
    ) -> ServiceResult<CounterSnapshot> {
        self.policy.ensure_allowed(kind)?;
        self.ensure_target(target_id).await?;

        let target_kind = self.policy.kind;
        if self
            .ctx
            .action_repo()
            .find(actor_id, target_kind, target_id, kind)
            .await?
        {
            debug!("Action already recorded, nothing to do");
            return self.get_stats(target_id).await;
        }

        let action = Action::new(actor_id, target_kind, target_id, kind);
        let outcome = self
            .ctx
            .action_repo()
            .record(&action, kind.opposite())
            .await?;

        match outcome {
            RecordOutcome::AlreadyExists => {
                debug!("Concurrent duplicate action, nothing to do");
            }
            RecordOutcome::Inserted { displaced } => {
                info!(
                    actor_id = %actor_id,
                    target_id = %target_id,
                    kind = %kind,
                    displaced = ?displaced,
                    "Action recorded"
                );
                self.apply_recorded(actor_id, target_id, kind, displaced)
                    .await;
            }
        }

        self.get_stats(target_id).await
    }

    /// Remove an action and return the target's counters.
    ///
    /// Cancelling an action the actor does not hold is a no-op.
    #[instrument(skip(self), fields(target_kind = %self.policy.kind))]
    pub async fn cancel_action(
        &self,
        actor_id: Id,
        target_id: Id,
        kind: ActionKind,
    ) -> ServiceResult<CounterSnapshot> {
        self.policy.ensure_allowed(kind)?;
        self.ensure_target(target_id).await?;

        let removed = self
            .ctx
            .action_repo()
            .delete(actor_id, self.policy.kind, target_id, kind)
            .await?;

        if removed == 0 {
            debug!("No action to cancel");
            return self.get_stats(target_id).await;
        }

        info!(
            actor_id = %actor_id,
            target_id = %target_id,
            kind = %kind,
            "Action cancelled"
        );

        let stats_key = keys::stats_key(self.policy.kind, target_id);
        self.warm(target_id, &stats_key).await;
        best_effort(
            "decrement counter",
            self.ctx
                .stats_cache()
                .incr_field(&stats_key, CounterField::from(kind).as_str(), -1)
                .await,
        );
        self.update_flags(actor_id, target_id, None, Some(kind)).await;
        self.mark_dirty(target_id).await;

        self.stats_after_write(target_id, &stats_key).await
    }

    /// Read a target's counters, cache first.
    ///
    /// A missing or all-zero cache entry is refilled from the relational
    /// snapshot.
    #[instrument(skip(self), fields(target_kind = %self.policy.kind))]
    pub async fn get_stats(&self, target_id: Id) -> ServiceResult<CounterSnapshot> {
        let stats_key = keys::stats_key(self.policy.kind, target_id);

        match self
            .ctx
            .stats_cache()
            .get_fields(&stats_key, &CounterField::names())
            .await
        {
            Ok(fields) if fields.values().any(|v| *v != 0) => {
                return Ok(CounterSnapshot::from_fields(&fields));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Stats cache read failed, using relational snapshot"),
        }

        let snapshot = self
            .ctx
            .target_repo()
            .read_snapshot(self.policy.kind, target_id)
            .await?
            .ok_or_else(|| DomainError::target_not_found(self.policy.kind, target_id))?;

        best_effort(
            "backfill stats",
            self.ctx
                .stats_cache()
                .set_fields(&stats_key, &snapshot.to_fields())
                .await,
        );

        Ok(snapshot)
    }

    /// Read which actions an actor holds on a target, cache first.
    #[instrument(skip(self), fields(target_kind = %self.policy.kind))]
    pub async fn get_user_action_status(
        &self,
        actor_id: Id,
        target_id: Id,
    ) -> ServiceResult<UserActionStatus> {
        let flags_key = keys::user_action_key(self.policy.kind, actor_id, target_id);

        match self.ctx.stats_cache().get_flags(&flags_key).await {
            Ok(flags) if !flags.is_empty() => return Ok(UserActionStatus::from_flags(&flags)),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Action flag read failed, using ledger"),
        }

        self.backfill_flags(actor_id, target_id, &flags_key).await
    }

    /// Count one view. Only the cache is written; reconciliation persists it.
    #[instrument(skip(self), fields(target_kind = %self.policy.kind))]
    pub async fn incr_view_count(&self, target_id: Id) -> ServiceResult<()> {
        self.policy.ensure_counts_views()?;

        let stats_key = keys::stats_key(self.policy.kind, target_id);
        self.warm(target_id, &stats_key).await;
        best_effort(
            "increment views",
            self.ctx
                .stats_cache()
                .incr_field(&stats_key, CounterField::View.as_str(), 1)
                .await,
        );
        self.mark_dirty(target_id).await;

        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn ensure_target(&self, target_id: Id) -> ServiceResult<()> {
        if self
            .ctx
            .target_repo()
            .exists(self.policy.kind, target_id)
            .await?
        {
            Ok(())
        } else {
            Err(DomainError::target_not_found(self.policy.kind, target_id).into())
        }
    }

    /// Counters right after this coordinator updated the stats hash.
    ///
    /// A present hash is returned as is, even when every field is zero: the
    /// relational snapshot lags the ledger until the next reconciliation.
    async fn stats_after_write(
        &self,
        target_id: Id,
        stats_key: &str,
    ) -> ServiceResult<CounterSnapshot> {
        match self
            .ctx
            .stats_cache()
            .get_fields(stats_key, &CounterField::names())
            .await
        {
            Ok(fields) if !fields.is_empty() => Ok(CounterSnapshot::from_fields(&fields)),
            _ => self.get_stats(target_id).await,
        }
    }

    /// Cache updates following a committed insert
    async fn apply_recorded(
        &self,
        actor_id: Id,
        target_id: Id,
        kind: ActionKind,
        displaced: Option<ActionKind>,
    ) {
        let stats_key = keys::stats_key(self.policy.kind, target_id);
        let cache = self.ctx.stats_cache();

        self.warm(target_id, &stats_key).await;
        best_effort(
            "increment counter",
            cache
                .incr_field(&stats_key, CounterField::from(kind).as_str(), 1)
                .await,
        );
        if let Some(opposite) = displaced {
            best_effort(
                "decrement displaced counter",
                cache
                    .incr_field(&stats_key, CounterField::from(opposite).as_str(), -1)
                    .await,
            );
        }
        self.update_flags(actor_id, target_id, Some(kind), displaced)
            .await;
        self.mark_dirty(target_id).await;
    }

    /// Make sure increments land on a populated stats hash.
    ///
    /// An absent hash is seeded from the relational snapshot first; otherwise
    /// the next `get_stats` would return only the delta.
    async fn warm(&self, target_id: Id, stats_key: &str) {
        let cache = self.ctx.stats_cache();
        match cache.get_fields(stats_key, &CounterField::names()).await {
            Ok(fields) if !fields.is_empty() => return,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Stats cache unavailable, skipping counter update");
                return;
            }
        }

        match self
            .ctx
            .target_repo()
            .read_snapshot(self.policy.kind, target_id)
            .await
        {
            Ok(Some(snapshot)) => {
                best_effort(
                    "seed stats",
                    cache.set_fields(stats_key, &snapshot.to_fields()).await,
                );
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read snapshot to seed stats cache"),
        }
    }

    /// Set and clear action flags. A cold flag hash is rebuilt from the
    /// ledger instead, which already reflects the committed change.
    async fn update_flags(
        &self,
        actor_id: Id,
        target_id: Id,
        set: Option<ActionKind>,
        clear: Option<ActionKind>,
    ) {
        let flags_key = keys::user_action_key(self.policy.kind, actor_id, target_id);
        let cache = self.ctx.stats_cache();

        match cache.get_flags(&flags_key).await {
            Ok(flags) if !flags.is_empty() => {
                if let Some(kind) = clear {
                    best_effort("clear flag", cache.clear_flag(&flags_key, kind.as_str()).await);
                }
                if let Some(kind) = set {
                    best_effort("set flag", cache.set_flag(&flags_key, kind.as_str()).await);
                }
            }
            Ok(_) => {
                if let Err(e) = self.backfill_flags(actor_id, target_id, &flags_key).await {
                    warn!(error = %e, "Could not rebuild action flags");
                }
            }
            Err(e) => warn!(error = %e, "Action flag cache unavailable, skipping flag update"),
        }
    }

    /// Aggregate an actor's actions from the ledger and cache every flag the
    /// policy knows about.
    async fn backfill_flags(
        &self,
        actor_id: Id,
        target_id: Id,
        flags_key: &str,
    ) -> ServiceResult<UserActionStatus> {
        let kinds = self
            .ctx
            .action_repo()
            .kinds_for_actor(actor_id, self.policy.kind, target_id)
            .await?;
        let status = UserActionStatus::from_kinds(&kinds);

        let cache = self.ctx.stats_cache();
        for kind in self.policy.actions {
            let result = if status.has(*kind) {
                cache.set_flag(flags_key, kind.as_str()).await
            } else {
                cache.clear_flag(flags_key, kind.as_str()).await
            };
            if best_effort("backfill flag", result).is_none() {
                break;
            }
        }

        Ok(status)
    }

    async fn mark_dirty(&self, target_id: Id) {
        best_effort(
            "mark dirty",
            self.ctx
                .stats_cache()
                .mark_dirty(&keys::dirty_key(self.policy.kind), target_id)
                .await,
        );
    }
}

/// Log and swallow a cache failure
fn best_effort<T>(operation: &'static str, result: CacheResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, error = %e, "Cache write skipped");
            None
        }
    }
}
