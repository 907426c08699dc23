//! Error handling utilities for repositories

use forum_core::error::DomainError;
use forum_core::value_objects::{Id, TargetKind};
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Convert an error raised inside a ledger transaction
pub fn map_tx_error(e: SqlxError) -> DomainError {
    DomainError::TransactionFailure(e.to_string())
}

/// Create a "target not found" error
pub fn target_not_found(kind: TargetKind, id: Id) -> DomainError {
    DomainError::target_not_found(kind, id)
}
