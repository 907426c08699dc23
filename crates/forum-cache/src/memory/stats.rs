//! DashMap-backed `StatsCache`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use forum_core::{CacheResult, DomainError, Id, StatsCache};

/// In-process stats cache.
///
/// `set_unavailable(true)` makes every call fail with
/// `DomainError::CacheUnavailable`, simulating an outage.
#[derive(Debug, Default)]
pub struct InMemoryStatsCache {
    hashes: DashMap<String, HashMap<String, String>>,
    sets: DashMap<String, HashSet<i64>>,
    unavailable: AtomicBool,
}

impl InMemoryStatsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated unavailability
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop every key, as after a cache flush
    pub fn flush(&self) {
        self.hashes.clear();
        self.sets.clear();
    }

    /// Check whether a hash key exists
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.hashes.contains_key(key)
    }

    /// Raw string value of a hash field
    #[must_use]
    pub fn raw_field(&self, key: &str, field: &str) -> Option<String> {
        self.hashes.get(key).and_then(|h| h.get(field).cloned())
    }

    /// Members of a set, sorted
    #[must_use]
    pub fn members(&self, set_key: &str) -> Vec<Id> {
        let mut ids: Vec<i64> = self
            .sets
            .get(set_key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.into_iter().map(Id::new).collect()
    }

    fn check(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::CacheUnavailable(
                "in-memory cache marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_int(key: &str, field: &str, raw: &str) -> CacheResult<i64> {
    raw.parse().map_err(|_| {
        DomainError::Serialization(format!("{key}.{field} is not an integer: {raw}"))
    })
}

#[async_trait]
impl StatsCache for InMemoryStatsCache {
    async fn incr_field(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        self.check()?;
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => parse_int(key, field, raw)?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn get_fields(&self, key: &str, fields: &[&str]) -> CacheResult<HashMap<String, i64>> {
        self.check()?;
        let Some(hash) = self.hashes.get(key) else {
            return Ok(HashMap::new());
        };

        let mut values = HashMap::new();
        for field in fields {
            if let Some(raw) = hash.get(*field) {
                values.insert((*field).to_string(), parse_int(key, field, raw)?);
            }
        }
        Ok(values)
    }

    async fn set_fields(&self, key: &str, values: &[(&str, i64)]) -> CacheResult<()> {
        self.check()?;
        if values.is_empty() {
            return Ok(());
        }
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        for (field, value) in values {
            hash.insert((*field).to_string(), value.to_string());
        }
        Ok(())
    }

    async fn set_flag(&self, key: &str, flag: &str) -> CacheResult<()> {
        self.check()?;
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(flag.to_string(), "1".to_string());
        Ok(())
    }

    async fn clear_flag(&self, key: &str, flag: &str) -> CacheResult<()> {
        self.check()?;
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(flag.to_string(), "0".to_string());
        Ok(())
    }

    async fn get_flags(&self, key: &str) -> CacheResult<HashMap<String, bool>> {
        self.check()?;
        Ok(self
            .hashes
            .get(key)
            .map(|hash| {
                hash.iter()
                    .map(|(flag, value)| (flag.clone(), value == "1"))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_dirty(&self, set_key: &str, id: Id) -> CacheResult<()> {
        self.check()?;
        self.sets
            .entry(set_key.to_string())
            .or_default()
            .insert(id.into_inner());
        Ok(())
    }

    async fn drain_dirty(&self, set_key: &str) -> CacheResult<Vec<Id>> {
        self.check()?;
        Ok(self.members(set_key))
    }

    async fn remove_dirty(&self, set_key: &str, ids: &[Id]) -> CacheResult<()> {
        self.check()?;
        if let Some(mut set) = self.sets.get_mut(set_key) {
            for id in ids {
                set.remove(&id.into_inner());
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.hashes.remove(key);
        self.sets.remove(key);
        Ok(())
    }
}
