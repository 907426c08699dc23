//! Value objects - immutable types that represent domain concepts

mod id;
mod kinds;

pub use id::{Id, IdParseError};
pub use kinds::{ActionKind, KindParseError, TargetKind};
