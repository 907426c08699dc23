//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in forum-core.

mod action;
mod error;
mod target;

pub use action::PgActionRepository;
pub use target::PgTargetRepository;
