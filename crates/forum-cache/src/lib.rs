//! # forum-cache
//!
//! Redis layer for interaction counters and the background task queue.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Stats Cache**: Counter hashes, per-user action flags, dirty sets
//! - **Task Broker**: Pending/active/retry/archive queues and schedule storage
//! - **In-memory fakes**: Drop-in `StatsCache` and `TaskBroker` for tests
//!
//! ## Example
//!
//! ```ignore
//! use forum_cache::{RedisPool, RedisPoolConfig, RedisStatsCache, RedisTaskBroker};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let cache = RedisStatsCache::new(pool.clone());
//! let broker = RedisTaskBroker::new(pool);
//!
//! cache.incr_field(&keys::stats_key(TargetKind::Post, id), "like_count", 1).await?;
//! ```

pub mod keys;
pub mod memory;
pub mod pool;
pub mod queue;
pub mod stats;

// Re-export pool types
pub use pool::{unavailable, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

pub use memory::{InMemoryStatsCache, InMemoryTaskBroker};
pub use queue::RedisTaskBroker;
pub use stats::RedisStatsCache;
