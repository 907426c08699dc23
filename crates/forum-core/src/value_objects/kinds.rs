//! Target kinds (what is acted on) and action kinds (what is done).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity kind an interaction applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    /// All target kinds, in reconciliation order
    pub const ALL: [TargetKind; 2] = [TargetKind::Post, TargetKind::Comment];

    /// Name used in cache keys and the ledger's `target_kind` column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    /// Relational table holding the targets and their persisted counters
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            _ => Err(KindParseError::Target(s.to_string())),
        }
    }
}

/// A discrete user reaction recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Like,
    Dislike,
    Favorite,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Like, ActionKind::Dislike, ActionKind::Favorite];

    /// Name used for the ledger `kind` column and user-action flag fields
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Favorite => "favorite",
        }
    }

    /// The mutually exclusive counterpart, if any.
    ///
    /// Like and dislike exclude each other; favorite is an independent axis.
    #[must_use]
    pub const fn opposite(&self) -> Option<ActionKind> {
        match self {
            Self::Like => Some(Self::Dislike),
            Self::Dislike => Some(Self::Like),
            Self::Favorite => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "favorite" => Ok(Self::Favorite),
            _ => Err(KindParseError::Action(s.to_string())),
        }
    }
}

/// Error when parsing a target or action kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KindParseError {
    #[error("unknown target kind: {0}")]
    Target(String),

    #[error("unknown action kind: {0}")]
    Action(String),
}
