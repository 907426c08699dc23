//! Action entity - one ledger row per actor, target, and action kind

use chrono::{DateTime, Utc};

use crate::value_objects::{ActionKind, Id, TargetKind};

/// A user's reaction to a post or comment, as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub actor_id: Id,
    pub target_id: Id,
    pub target_kind: TargetKind,
    pub kind: ActionKind,
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Create a new Action stamped with the current time
    pub fn new(actor_id: Id, target_kind: TargetKind, target_id: Id, kind: ActionKind) -> Self {
        Self {
            actor_id,
            target_id,
            target_kind,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Check whether this action excludes `other` on the same target
    #[inline]
    pub fn excludes(&self, other: ActionKind) -> bool {
        self.kind.opposite() == Some(other)
    }
}
