//! Job handlers run by the worker

mod sync;

pub use sync::{SyncHandler, SyncPayload, SYNC_JOB_TYPE};
