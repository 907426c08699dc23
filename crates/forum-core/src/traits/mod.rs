//! Ports - the interfaces the domain needs from infrastructure

mod cache;
mod repositories;
mod tasks;

pub use cache::{CacheResult, StatsCache};
pub use repositories::{ActionRepository, RecordOutcome, RepoResult, TargetRepository};
pub use tasks::{ScheduleEntry, TaskBroker, TaskMessage};
