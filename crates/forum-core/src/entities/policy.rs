//! Per-kind interaction policy.
//!
//! Posts and comments share one coordinator and one reconciliation job; the
//! policy captures what differs between them.

use crate::error::DomainError;
use crate::value_objects::{ActionKind, TargetKind};

/// Which actions a target kind accepts and whether it counts views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    pub kind: TargetKind,
    pub actions: &'static [ActionKind],
    pub counts_views: bool,
}

impl TargetPolicy {
    /// Posts: like, dislike, favorite, and view counting
    pub const POST: TargetPolicy = TargetPolicy {
        kind: TargetKind::Post,
        actions: &[ActionKind::Like, ActionKind::Dislike, ActionKind::Favorite],
        counts_views: true,
    };

    /// Comments: like and dislike only
    pub const COMMENT: TargetPolicy = TargetPolicy {
        kind: TargetKind::Comment,
        actions: &[ActionKind::Like, ActionKind::Dislike],
        counts_views: false,
    };

    /// Policy for a target kind
    #[must_use]
    pub const fn for_kind(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Post => Self::POST,
            TargetKind::Comment => Self::COMMENT,
        }
    }

    #[must_use]
    pub fn allows(&self, action: ActionKind) -> bool {
        self.actions.contains(&action)
    }

    /// Reject actions this target kind does not accept
    pub fn ensure_allowed(&self, action: ActionKind) -> Result<(), DomainError> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(DomainError::UnsupportedAction {
                target_kind: self.kind,
                action: action.to_string(),
            })
        }
    }

    /// Reject view counting on kinds without a view counter
    pub fn ensure_counts_views(&self) -> Result<(), DomainError> {
        if self.counts_views {
            Ok(())
        } else {
            Err(DomainError::UnsupportedAction {
                target_kind: self.kind,
                action: "view".to_string(),
            })
        }
    }
}
