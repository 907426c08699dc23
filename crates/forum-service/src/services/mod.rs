//! Business logic services
//!
//! Services borrow a `ServiceContext` and orchestrate the ledger, the
//! relational snapshot, and the stats cache.

pub mod context;
pub mod error;
pub mod interaction;
pub mod sync;

pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
pub use interaction::InteractionService;
pub use sync::{SyncReport, SyncService, DEFAULT_BATCH_SIZE};
