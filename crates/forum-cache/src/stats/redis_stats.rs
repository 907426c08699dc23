//! Redis implementation of the `StatsCache` port.
//!
//! Counters live in `stats:*` hashes, action flags in `useraction:*` hashes
//! (valued `"1"` / `"0"`), and targets awaiting reconciliation in `dirty:*` sets.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::instrument;

use forum_core::{CacheResult, Id, StatsCache};

use crate::pool::{unavailable, RedisPool};

const FLAG_SET: &str = "1";
const FLAG_CLEAR: &str = "0";

/// Stats cache over the shared Redis pool
#[derive(Clone)]
pub struct RedisStatsCache {
    pool: RedisPool,
}

impl RedisStatsCache {
    /// Create a new stats cache
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsCache for RedisStatsCache {
    #[instrument(skip(self))]
    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let value: i64 = conn.hincr(key, field, delta).await.map_err(unavailable)?;
        Ok(value)
    }

    #[instrument(skip(self))]
    async fn get_fields(&self, key: &str, fields: &[&str]) -> CacheResult<HashMap<String, i64>> {
        if fields.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let values: Vec<Option<i64>> = redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(fields
            .iter()
            .zip(values)
            .filter_map(|(field, value)| value.map(|v| ((*field).to_string(), v)))
            .collect())
    }

    #[instrument(skip(self))]
    async fn set_fields(&self, key: &str, values: &[(&str, i64)]) -> CacheResult<()> {
        if values.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.hset_multiple::<_, _, _, ()>(key, values)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_flag(&self, key: &str, flag: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.hset::<_, _, _, ()>(key, flag, FLAG_SET)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_flag(&self, key: &str, flag: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.hset::<_, _, _, ()>(key, flag, FLAG_CLEAR)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_flags(&self, key: &str) -> CacheResult<HashMap<String, bool>> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let raw: HashMap<String, String> = conn.hgetall(key).await.map_err(unavailable)?;

        Ok(raw
            .into_iter()
            .map(|(flag, value)| (flag, value == FLAG_SET))
            .collect())
    }

    #[instrument(skip(self))]
    async fn mark_dirty(&self, set_key: &str, id: Id) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.sadd::<_, _, ()>(set_key, id.into_inner())
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn drain_dirty(&self, set_key: &str) -> CacheResult<Vec<Id>> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        let members: Vec<i64> = conn.smembers(set_key).await.map_err(unavailable)?;
        Ok(members.into_iter().map(Id::new).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn remove_dirty(&self, set_key: &str, ids: &[Id]) -> CacheResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let members: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.srem::<_, _, ()>(set_key, members)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(unavailable)?;
        conn.del::<_, ()>(key).await.map_err(unavailable)?;
        Ok(())
    }
}
