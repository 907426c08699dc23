//! Action entity <-> model mapper

use forum_core::entities::Action;
use forum_core::error::DomainError;
use forum_core::value_objects::{ActionKind, Id, TargetKind};

use crate::models::ActionModel;

/// Convert ActionModel to Action entity
impl TryFrom<ActionModel> for Action {
    type Error = DomainError;

    fn try_from(model: ActionModel) -> Result<Self, Self::Error> {
        let target_kind: TargetKind = model
            .target_kind
            .parse()
            .map_err(|e: forum_core::KindParseError| DomainError::DatabaseError(e.to_string()))?;
        let kind: ActionKind = model
            .kind
            .parse()
            .map_err(|e: forum_core::KindParseError| DomainError::DatabaseError(e.to_string()))?;

        Ok(Action {
            actor_id: Id::new(model.actor_id),
            target_id: Id::new(model.target_id),
            target_kind,
            kind,
            created_at: model.created_at,
        })
    }
}

/// Action values bound into ledger statements
pub struct ActionInsert {
    pub actor_id: i64,
    pub target_kind: &'static str,
    pub target_id: i64,
    pub kind: &'static str,
}

impl ActionInsert {
    pub fn new(action: &Action) -> Self {
        Self {
            actor_id: action.actor_id.into_inner(),
            target_kind: action.target_kind.as_str(),
            target_id: action.target_id.into_inner(),
            kind: action.kind.as_str(),
        }
    }
}
