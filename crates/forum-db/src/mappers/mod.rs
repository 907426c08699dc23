//! Entity to model mappers
//!
//! - `TryFrom<ActionModel> for Action`: rows carry kinds as text
//! - `From<CounterModel> for CounterSnapshot`

mod action;
mod counters;

pub use action::ActionInsert;
