//! Action ledger database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the interaction_actions table
#[derive(Debug, Clone, FromRow)]
pub struct ActionModel {
    pub actor_id: i64,
    pub target_kind: String,
    pub target_id: i64,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}
