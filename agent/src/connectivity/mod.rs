//! Connectivity tracking and replay on reconnection.
//!
//! [`Reachability`] is the host's online/offline signal. The
//! [`ConnectivityMonitor`] listens to it, fans transitions out to
//! subscribers, and starts a replay pass whenever the host comes back online.

mod monitor;
mod probe;
mod reachability;

pub use monitor::{ConnectivityMonitor, Listener, Subscription};
pub use probe::probe;
pub use reachability::Reachability;
