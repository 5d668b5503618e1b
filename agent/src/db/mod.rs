//! Database module for on-device SQLite persistence.

mod operations;
mod pool;
mod snapshots;

pub use operations::*;
pub use pool::*;
pub use snapshots::*;
