//! Host reachability signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Capacity of the transition channel. Slow listeners that fall further
/// behind than this see `Lagged` and resynchronize from `is_online`.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// The host's binary online/offline flag plus a stream of its transitions.
///
/// The flag is heuristic: it reports what the host believes, not whether the
/// next request will succeed.
#[derive(Debug)]
pub struct Reachability {
    online: AtomicBool,
    events: broadcast::Sender<bool>,
}

impl Reachability {
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            online: AtomicBool::new(initially_online),
            events,
        }
    }

    /// Create a new signal wrapped in Arc for sharing.
    pub fn new_shared(initially_online: bool) -> Arc<Self> {
        Arc::new(Self::new(initially_online))
    }

    /// Point-in-time read of the flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Record the host's current reachability.
    ///
    /// Emits an event only when the value changes. Returns true if it did.
    pub fn set_online(&self, online: bool) -> bool {
        if self.online.swap(online, Ordering::AcqRel) == online {
            return false;
        }

        tracing::info!(online, "Reachability changed");
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(online);
        true
    }

    /// Receive every transition from now on.
    pub fn listen(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }
}

impl Default for Reachability {
    fn default() -> Self {
        Self::new(false)
    }
}
