//! Repository traits (ports) for the relational store and the action ledger
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;

use crate::entities::{Action, CounterSnapshot};
use crate::error::DomainError;
use crate::value_objects::{ActionKind, Id, TargetKind};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Outcome of recording an action in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The row was inserted. `displaced` names the opposite reaction that was
    /// deleted in the same transaction, if one existed.
    Inserted { displaced: Option<ActionKind> },
    /// An identical row already existed; nothing was changed.
    AlreadyExists,
}

impl RecordOutcome {
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

// ============================================================================
// Target Repository
// ============================================================================

/// Posts and comments as seen by the counter engine: existence and the
/// persisted counter columns.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Check whether a live (not deleted) target exists
    async fn exists(&self, kind: TargetKind, id: Id) -> RepoResult<bool>;

    /// Read the persisted counters, `None` if the target does not exist
    async fn read_snapshot(&self, kind: TargetKind, id: Id) -> RepoResult<Option<CounterSnapshot>>;

    /// Overwrite the persisted counters.
    ///
    /// Returns `DomainError::TargetNotFound` when the target no longer exists.
    async fn upsert_snapshot(
        &self,
        kind: TargetKind,
        id: Id,
        snapshot: &CounterSnapshot,
    ) -> RepoResult<()>;
}

// ============================================================================
// Action Repository (ledger)
// ============================================================================

#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Check whether the exact `(actor, target, kind)` row exists
    async fn find(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
        kind: ActionKind,
    ) -> RepoResult<bool>;

    /// Insert `action` in a single transaction; when `displaces` is set, any
    /// row of that kind for the same actor and target is deleted first.
    ///
    /// Failures are reported as `DomainError::TransactionFailure` and leave
    /// the ledger unchanged.
    async fn record(&self, action: &Action, displaces: Option<ActionKind>) -> RepoResult<RecordOutcome>;

    /// Delete a row, returning the number of rows affected
    async fn delete(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
        kind: ActionKind,
    ) -> RepoResult<u64>;

    /// Count rows of one kind on a target
    async fn count(&self, target_kind: TargetKind, target_id: Id, kind: ActionKind) -> RepoResult<i64>;

    /// All action kinds an actor currently holds on a target
    async fn kinds_for_actor(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
    ) -> RepoResult<Vec<ActionKind>>;
}
