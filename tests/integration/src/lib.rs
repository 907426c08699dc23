//! Integration test utilities for the interaction engine
//!
//! End-to-end tests run the coordinator, reconciliation, and the worker
//! against in-memory stores, so no database or Redis is needed.

pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
