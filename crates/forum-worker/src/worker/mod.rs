//! Worker runtime
//!
//! - `handler`: the handler trait and handler-reported failures
//! - `runner`: due-tick evaluation for persisted schedules
//! - `processor`: the dequeue loop and the shutdown handle

mod handler;
mod processor;
mod runner;

pub use handler::{FnHandler, HandlerError, TaskHandler};
pub use processor::{retry_delay, Worker, WorkerHandle, WorkerOptions};
pub use runner::ScheduleRunner;
