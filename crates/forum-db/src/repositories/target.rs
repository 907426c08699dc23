//! PostgreSQL implementation of TargetRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use forum_core::entities::CounterSnapshot;
use forum_core::traits::{RepoResult, TargetRepository};
use forum_core::value_objects::{Id, TargetKind};

use crate::models::CounterModel;

use super::error::{map_db_error, target_not_found};

/// PostgreSQL implementation of TargetRepository over the `posts` and
/// `comments` tables. Soft-deleted rows count as missing.
#[derive(Clone)]
pub struct PgTargetRepository {
    pool: PgPool,
}

impl PgTargetRepository {
    /// Create a new PgTargetRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetRepository for PgTargetRepository {
    #[instrument(skip(self))]
    async fn exists(&self, kind: TargetKind, id: Id) -> RepoResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND deleted_at IS NULL)",
            kind.table()
        );

        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn read_snapshot(&self, kind: TargetKind, id: Id) -> RepoResult<Option<CounterSnapshot>> {
        let sql = format!(
            r#"
            SELECT like_count, dislike_count, favorite_count, view_count
            FROM {}
            WHERE id = $1 AND deleted_at IS NULL
            "#,
            kind.table()
        );

        let result = sqlx::query_as::<_, CounterModel>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(CounterSnapshot::from))
    }

    #[instrument(skip(self))]
    async fn upsert_snapshot(
        &self,
        kind: TargetKind,
        id: Id,
        snapshot: &CounterSnapshot,
    ) -> RepoResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET like_count = $2, dislike_count = $3, favorite_count = $4, view_count = $5,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
            kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(id.into_inner())
            .bind(snapshot.like_count)
            .bind(snapshot.dislike_count)
            .bind(snapshot.favorite_count)
            .bind(snapshot.view_count)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(target_not_found(kind, id));
        }

        Ok(())
    }
}
