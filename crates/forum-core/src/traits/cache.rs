//! Stats cache port.
//!
//! Every primitive is expected to be atomic at the store level; callers never
//! wrap them in higher-level locks.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DomainError;
use crate::value_objects::Id;

/// Result type for cache operations. Failures are `DomainError::CacheUnavailable`.
pub type CacheResult<T> = Result<T, DomainError>;

#[async_trait]
pub trait StatsCache: Send + Sync {
    /// Atomically add `delta` to a hash field, returning the new value
    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64>;

    /// Read integer hash fields. Absent fields are omitted; an absent key
    /// yields an empty map.
    async fn get_fields(&self, key: &str, fields: &[&str]) -> CacheResult<HashMap<String, i64>>;

    /// Write integer hash fields
    async fn set_fields(&self, key: &str, values: &[(&str, i64)]) -> CacheResult<()>;

    /// Set a boolean flag field to true
    async fn set_flag(&self, key: &str, flag: &str) -> CacheResult<()>;

    /// Set a boolean flag field to false
    async fn clear_flag(&self, key: &str, flag: &str) -> CacheResult<()>;

    /// Read every flag field of a hash; an absent key yields an empty map
    async fn get_flags(&self, key: &str) -> CacheResult<HashMap<String, bool>>;

    /// Add a target id to a dirty set
    async fn mark_dirty(&self, set_key: &str, id: Id) -> CacheResult<()>;

    /// Read every member of a dirty set without removing them
    async fn drain_dirty(&self, set_key: &str) -> CacheResult<Vec<Id>>;

    /// Remove ids from a dirty set
    async fn remove_dirty(&self, set_key: &str, ids: &[Id]) -> CacheResult<()>;

    /// Delete a key
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
