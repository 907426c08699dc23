//! # forum-core
//!
//! Domain layer for post and comment interactions: action kinds, counter
//! snapshots, per-kind policies, domain errors, and the ports implemented by
//! the storage, cache, and task-queue adapters.
//! This crate has zero dependencies on infrastructure (database, cache client, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Action, CounterField, CounterSnapshot, TargetPolicy, UserActionStatus};
pub use error::DomainError;
pub use traits::{
    ActionRepository, CacheResult, RecordOutcome, RepoResult, ScheduleEntry, StatsCache,
    TargetRepository, TaskBroker, TaskMessage,
};
pub use value_objects::{ActionKind, Id, IdParseError, KindParseError, TargetKind};
