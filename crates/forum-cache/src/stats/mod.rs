//! Stats cache backed by Redis hashes and sets.

mod redis_stats;

pub use redis_stats::RedisStatsCache;
