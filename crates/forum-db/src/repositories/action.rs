//! PostgreSQL implementation of ActionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use forum_core::entities::Action;
use forum_core::error::DomainError;
use forum_core::traits::{ActionRepository, RecordOutcome, RepoResult};
use forum_core::value_objects::{ActionKind, Id, TargetKind};

use crate::mappers::ActionInsert;
use crate::models::ActionModel;

use super::error::{map_db_error, map_tx_error};

/// PostgreSQL implementation of the action ledger
#[derive(Clone)]
pub struct PgActionRepository {
    pool: PgPool,
}

impl PgActionRepository {
    /// Create a new PgActionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List ledger rows of a target, oldest first
    #[instrument(skip(self))]
    pub async fn list_for_target(
        &self,
        target_kind: TargetKind,
        target_id: Id,
    ) -> RepoResult<Vec<Action>> {
        let rows = sqlx::query_as::<_, ActionModel>(
            r#"
            SELECT actor_id, target_kind, target_id, kind, created_at
            FROM interaction_actions
            WHERE target_kind = $1 AND target_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(target_kind.as_str())
        .bind(target_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Action::try_from).collect()
    }
}

#[async_trait]
impl ActionRepository for PgActionRepository {
    #[instrument(skip(self))]
    async fn find(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
        kind: ActionKind,
    ) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM interaction_actions
                WHERE actor_id = $1 AND target_kind = $2 AND target_id = $3 AND kind = $4
            )
            "#,
        )
        .bind(actor_id.into_inner())
        .bind(target_kind.as_str())
        .bind(target_id.into_inner())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self, action), fields(actor = %action.actor_id, target = %action.target_id, kind = %action.kind))]
    async fn record(&self, action: &Action, displaces: Option<ActionKind>) -> RepoResult<RecordOutcome> {
        let insert = ActionInsert::new(action);
        let mut tx = self.pool.begin().await.map_err(map_tx_error)?;

        let mut displaced = None;
        if let Some(opposite) = displaces {
            let deleted = sqlx::query(
                r#"
                DELETE FROM interaction_actions
                WHERE actor_id = $1 AND target_kind = $2 AND target_id = $3 AND kind = $4
                "#,
            )
            .bind(insert.actor_id)
            .bind(insert.target_kind)
            .bind(insert.target_id)
            .bind(opposite.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_tx_error)?;

            if deleted.rows_affected() > 0 {
                displaced = Some(opposite);
            }
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO interaction_actions (actor_id, target_kind, target_id, kind, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (actor_id, target_kind, target_id, kind) DO NOTHING
            "#,
        )
        .bind(insert.actor_id)
        .bind(insert.target_kind)
        .bind(insert.target_id)
        .bind(insert.kind)
        .bind(action.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_tx_error)?;

        if inserted.rows_affected() == 0 {
            // Identical row already present. Rolling back restores any displaced row.
            tx.rollback().await.map_err(map_tx_error)?;
            debug!("action already recorded");
            return Ok(RecordOutcome::AlreadyExists);
        }

        tx.commit().await.map_err(map_tx_error)?;

        Ok(RecordOutcome::Inserted { displaced })
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
        kind: ActionKind,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM interaction_actions
            WHERE actor_id = $1 AND target_kind = $2 AND target_id = $3 AND kind = $4
            "#,
        )
        .bind(actor_id.into_inner())
        .bind(target_kind.as_str())
        .bind(target_id.into_inner())
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn count(&self, target_kind: TargetKind, target_id: Id, kind: ActionKind) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM interaction_actions
            WHERE target_kind = $1 AND target_id = $2 AND kind = $3
            "#,
        )
        .bind(target_kind.as_str())
        .bind(target_id.into_inner())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn kinds_for_actor(
        &self,
        actor_id: Id,
        target_kind: TargetKind,
        target_id: Id,
    ) -> RepoResult<Vec<ActionKind>> {
        let kinds = sqlx::query_scalar::<_, String>(
            r#"
            SELECT kind
            FROM interaction_actions
            WHERE actor_id = $1 AND target_kind = $2 AND target_id = $3
            "#,
        )
        .bind(actor_id.into_inner())
        .bind(target_kind.as_str())
        .bind(target_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        kinds
            .iter()
            .map(|k| {
                k.parse::<ActionKind>()
                    .map_err(|e| DomainError::DatabaseError(e.to_string()))
            })
            .collect()
    }
}
