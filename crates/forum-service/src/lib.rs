//! # forum-service
//!
//! Application layer: the action coordinator for posts and comments and the
//! job that reconciles cached counters with the action ledger.

pub mod services;

pub use services::{
    InteractionService, ServiceContext, ServiceError, ServiceResult, SyncReport, SyncService,
    DEFAULT_BATCH_SIZE,
};
