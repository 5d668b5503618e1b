//! Connectivity monitor.
//!
//! Turns reachability transitions into subscriber notifications and replay
//! passes. One instance is wired up at startup and shared by handle.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::Reachability;
use crate::queue::OperationQueue;

/// Callback invoked with `true`/`false` on each reachability transition.
pub type Listener = Arc<dyn Fn(bool) + Send + Sync>;

type Subscribers = DashMap<Uuid, Listener>;

/// Handle returned by [`ConnectivityMonitor::subscribe`].
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Remove exactly this listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.subscribers.upgrade() {
            Some(subscribers) => subscribers.remove(&self.id).is_some(),
            None => false,
        }
    }
}

struct Inner {
    reachability: Arc<Reachability>,
    queue: Arc<OperationQueue>,
    subscribers: Arc<Subscribers>,
}

impl Inner {
    fn notify(&self, online: bool) {
        // Snapshot first so a listener may unsubscribe from inside its callback.
        let listeners: Vec<Listener> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        tracing::debug!(online, listeners = listeners.len(), "Notifying subscribers");

        for listener in listeners {
            listener(online);
        }
    }

    fn handle_online(&self) {
        self.notify(true);

        let queue = self.queue.clone();
        tokio::spawn(async move {
            match queue.replay().await {
                Ok(Some(report)) => tracing::info!(
                    success = report.success,
                    failed = report.failed,
                    evicted = report.evicted,
                    "Replay after reconnect finished"
                ),
                Ok(None) => tracing::debug!("Replay after reconnect coalesced"),
                Err(e) => tracing::error!("Replay after reconnect failed: {}", e),
            }
        });
    }

    fn handle_offline(&self) {
        self.notify(false);
    }

    /// Handle `online` unless it repeats the last state delivered.
    fn deliver(&self, last: &mut Option<bool>, online: bool) {
        if *last == Some(online) {
            return;
        }
        *last = Some(online);

        if online {
            self.handle_online();
        } else {
            self.handle_offline();
        }
    }

    async fn listen(&self, mut events: broadcast::Receiver<bool>) {
        let mut last = None;
        loop {
            match events.recv().await {
                Ok(online) => self.deliver(&mut last, online),
                Err(RecvError::Lagged(skipped)) => {
                    let online = self.reachability.is_online();
                    tracing::warn!(skipped, online, "Missed reachability events, resyncing");
                    self.deliver(&mut last, online);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Watches reachability and replays the queue on reconnection.
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(reachability: Arc<Reachability>, queue: Arc<OperationQueue>) -> Self {
        Self {
            inner: Arc::new(Inner {
                reachability,
                queue,
                subscribers: Arc::new(DashMap::new()),
            }),
            listener_task: Mutex::new(None),
        }
    }

    /// Create a new monitor wrapped in Arc for sharing.
    pub fn new_shared(reachability: Arc<Reachability>, queue: Arc<OperationQueue>) -> Arc<Self> {
        Arc::new(Self::new(reachability, queue))
    }

    /// Start listening for reachability transitions.
    ///
    /// Idempotent: returns false without doing anything if already
    /// initialized. Must be called inside a Tokio runtime.
    pub fn initialize(&self) -> bool {
        let mut task = self
            .listener_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return false;
        }

        let inner = self.inner.clone();
        let events = inner.reachability.listen();

        *task = Some(tokio::spawn(async move { inner.listen(events).await }));

        tracing::info!("Connectivity monitor initialized");
        true
    }

    /// Whether the listener task is running.
    pub fn is_initialized(&self) -> bool {
        self.listener_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Point-in-time read of the host's reachability flag.
    pub fn is_online(&self) -> bool {
        self.inner.reachability.is_online()
    }

    /// Register a listener for reachability transitions.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner.subscribers.insert(id, Arc::new(listener));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.inner.subscribers),
        }
    }

    /// Get the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Stop listening and drop every subscriber.
    ///
    /// Safe to call repeatedly or before [`initialize`](Self::initialize);
    /// the monitor can be initialized again afterwards.
    pub fn cleanup(&self) {
        let task = self
            .listener_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            tracing::info!("Connectivity monitor stopped");
        }

        self.inner.subscribers.clear();
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cleanup();
    }
}
