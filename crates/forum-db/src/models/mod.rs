//! Database models
//!
//! Row types mapped with `sqlx::FromRow`.

mod action;
mod counters;

pub use action::ActionModel;
pub use counters::CounterModel;
