//! Request handlers for the local API.

mod queue;
mod snapshots;

pub use queue::*;
pub use snapshots::*;
