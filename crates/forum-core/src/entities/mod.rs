//! Domain entities - ledger rows, counter snapshots, and per-kind policies

mod action;
mod counters;
mod policy;

pub use action::Action;
pub use counters::{CounterField, CounterSnapshot, UserActionStatus};
pub use policy::TargetPolicy;
