//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{Id, TargetKind};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Caller-visible failures
    // =========================================================================
    #[error("{kind} not found: {id}")]
    TargetNotFound { kind: TargetKind, id: Id },

    #[error("Action {action} is not supported on {target_kind}")]
    UnsupportedAction {
        target_kind: TargetKind,
        action: String,
    },

    #[error("Ledger transaction failed: {0}")]
    TransactionFailure(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::TargetNotFound { kind, .. } => match kind {
                TargetKind::Post => "UNKNOWN_POST",
                TargetKind::Comment => "UNKNOWN_COMMENT",
            },
            Self::UnsupportedAction { .. } => "UNSUPPORTED_ACTION",
            Self::TransactionFailure(_) => "TRANSACTION_FAILURE",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TargetNotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::UnsupportedAction { .. })
    }

    /// Check if this error came from the cache store
    pub fn is_cache(&self) -> bool {
        matches!(self, Self::CacheUnavailable(_))
    }

    /// Helper for the common "target missing" construction
    pub fn target_not_found(kind: TargetKind, id: Id) -> Self {
        Self::TargetNotFound { kind, id }
    }
}
