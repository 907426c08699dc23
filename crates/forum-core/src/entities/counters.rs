//! Counter snapshots and per-user action status

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value_objects::ActionKind;

/// A named counter on a target's stats hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterField {
    Like,
    Dislike,
    Favorite,
    View,
}

impl CounterField {
    pub const ALL: [CounterField; 4] = [
        CounterField::Like,
        CounterField::Dislike,
        CounterField::Favorite,
        CounterField::View,
    ];

    /// Field name in the cache hash and column name in the relational store
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like_count",
            Self::Dislike => "dislike_count",
            Self::Favorite => "favorite_count",
            Self::View => "view_count",
        }
    }

    /// Field names of every counter, in snapshot order
    #[must_use]
    pub fn names() -> [&'static str; 4] {
        Self::ALL.map(|f| f.as_str())
    }

    /// Parse a cache hash field name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl From<ActionKind> for CounterField {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Like => Self::Like,
            ActionKind::Dislike => Self::Dislike,
            ActionKind::Favorite => Self::Favorite,
        }
    }
}

/// Aggregate interaction counters of a single target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
    pub view_count: i64,
}

impl CounterSnapshot {
    /// Create a snapshot from explicit counts
    #[must_use]
    pub const fn new(like: i64, dislike: i64, favorite: i64, view: i64) -> Self {
        Self {
            like_count: like,
            dislike_count: dislike,
            favorite_count: favorite,
            view_count: view,
        }
    }

    /// Read one counter
    #[must_use]
    pub fn get(&self, field: CounterField) -> i64 {
        match field {
            CounterField::Like => self.like_count,
            CounterField::Dislike => self.dislike_count,
            CounterField::Favorite => self.favorite_count,
            CounterField::View => self.view_count,
        }
    }

    /// Overwrite one counter
    pub fn set(&mut self, field: CounterField, value: i64) {
        match field {
            CounterField::Like => self.like_count = value,
            CounterField::Dislike => self.dislike_count = value,
            CounterField::Favorite => self.favorite_count = value,
            CounterField::View => self.view_count = value,
        }
    }

    /// True when every counter is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        CounterField::ALL.iter().all(|f| self.get(*f) == 0)
    }

    /// Build a snapshot from cache hash fields. Missing fields read as zero,
    /// negative drift is clamped to zero.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, i64>) -> Self {
        let mut snapshot = Self::default();
        for field in CounterField::ALL {
            if let Some(value) = fields.get(field.as_str()) {
                snapshot.set(field, (*value).max(0));
            }
        }
        snapshot
    }

    /// Field/value pairs for writing the snapshot into a cache hash
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, i64)> {
        CounterField::ALL
            .iter()
            .map(|f| (f.as_str(), self.get(*f)))
            .collect()
    }
}

/// Which reactions a given actor currently holds on a target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActionStatus {
    pub has_liked: bool,
    pub has_disliked: bool,
    pub has_favorited: bool,
}

impl UserActionStatus {
    /// Build from the set of action kinds present in the ledger
    #[must_use]
    pub fn from_kinds(kinds: &[ActionKind]) -> Self {
        let mut status = Self::default();
        for kind in kinds {
            status.set(*kind, true);
        }
        status
    }

    /// Build from cached flag fields; missing flags read as false
    #[must_use]
    pub fn from_flags(flags: &HashMap<String, bool>) -> Self {
        let mut status = Self::default();
        for kind in ActionKind::ALL {
            if flags.get(kind.as_str()).copied().unwrap_or(false) {
                status.set(kind, true);
            }
        }
        status
    }

    #[must_use]
    pub fn has(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Like => self.has_liked,
            ActionKind::Dislike => self.has_disliked,
            ActionKind::Favorite => self.has_favorited,
        }
    }

    pub fn set(&mut self, kind: ActionKind, value: bool) {
        match kind {
            ActionKind::Like => self.has_liked = value,
            ActionKind::Dislike => self.has_disliked = value,
            ActionKind::Favorite => self.has_favorited = value,
        }
    }
}
