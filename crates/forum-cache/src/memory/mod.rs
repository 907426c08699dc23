//! In-memory implementations of the cache ports.
//!
//! Behave like the Redis adapters within a single process. Used by unit and
//! end-to-end tests, and usable for local runs without Redis.

mod broker;
mod stats;

pub use broker::InMemoryTaskBroker;
pub use stats::InMemoryStatsCache;
