//! Background replay and snapshot refresh.
//!
//! The queue never sleeps between passes. This scheduler is the caller that
//! honours the advisory backoff: after a pass with failures it holds off for
//! `retry_delay(n)`, where `n` counts consecutive failing passes.

use std::sync::Arc;
use std::time::Duration;

use tether_engine::{Collection, PassReport, RetryPolicy};
use tokio::time::{Instant, MissedTickBehavior};

use crate::connectivity::Reachability;
use crate::feed;
use crate::queue::OperationQueue;
use crate::snapshot_store::LocalSnapshotStore;
use crate::transport::Transport;

/// Backoff state across replay passes.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    failing_passes: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failing_passes: 0,
        }
    }

    /// Feed a pass result. Returns how long to wait before the next pass,
    /// or `None` when the pass was clean.
    pub fn record(&mut self, report: &PassReport) -> Option<Duration> {
        if report.is_clean() {
            self.reset();
            return None;
        }

        let step = self
            .failing_passes
            .min(self.policy.max_retries.saturating_sub(1));
        self.failing_passes = self.failing_passes.saturating_add(1);
        Some(self.policy.retry_delay(step))
    }

    pub fn reset(&mut self) {
        self.failing_passes = 0;
    }

    pub fn failing_passes(&self) -> u32 {
        self.failing_passes
    }
}

/// What one replay tick of the scheduler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayTick {
    /// The host is offline; nothing was attempted.
    Offline,
    /// The queue was empty.
    Idle,
    /// Another caller is driving a replay and took this trigger.
    Coalesced,
    /// A replay ran. `hold` is the backoff to observe before the next one.
    Replayed {
        report: PassReport,
        hold: Option<Duration>,
    },
    /// The replay aborted on a storage error.
    Aborted,
}

/// Periodically replays the queue and refreshes snapshots while online.
pub struct SyncScheduler {
    pub queue: Arc<OperationQueue>,
    pub store: LocalSnapshotStore,
    pub transport: Arc<dyn Transport>,
    pub reachability: Arc<Reachability>,
    pub replay_interval: Duration,
    pub snapshot_interval: Duration,
}

impl SyncScheduler {
    /// Run until the task is aborted.
    pub async fn run(self) {
        let mut backoff = Backoff::new(*self.queue.policy());
        let mut hold_until: Option<Instant> = None;

        let mut replay_tick = tokio::time::interval(self.replay_interval);
        replay_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut snapshot_tick = tokio::time::interval(self.snapshot_interval);
        snapshot_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            replay_interval = ?self.replay_interval,
            snapshot_interval = ?self.snapshot_interval,
            "Sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = replay_tick.tick() => {
                    let held = hold_until.is_some_and(|until| Instant::now() < until);
                    if !held {
                        hold_until = match self.replay_once(&mut backoff).await {
                            ReplayTick::Replayed { hold: Some(delay), .. } => {
                                Some(Instant::now() + delay)
                            }
                            _ => None,
                        };
                    }
                }
                _ = snapshot_tick.tick() => {
                    if self.reachability.is_online() {
                        self.refresh_snapshots().await;
                    }
                }
            }
        }
    }

    /// Replay if online and there is work.
    pub async fn replay_once(&self, backoff: &mut Backoff) -> ReplayTick {
        if !self.reachability.is_online() {
            return ReplayTick::Offline;
        }
        if self.queue.queue_length().await == 0 {
            return ReplayTick::Idle;
        }

        let report = match self.queue.replay().await {
            Ok(Some(report)) => report,
            Ok(None) => return ReplayTick::Coalesced,
            Err(e) => {
                tracing::error!("Scheduled replay failed: {}", e);
                return ReplayTick::Aborted;
            }
        };

        // Replayed writes changed the remote; pull fresh snapshots.
        if report.success > 0 {
            self.refresh_snapshots().await;
        }

        let hold = backoff.record(&report);
        if let Some(delay) = hold {
            tracing::info!(
                failing_passes = backoff.failing_passes(),
                ?delay,
                "Backing off before next replay"
            );
        }
        ReplayTick::Replayed { report, hold }
    }

    async fn refresh_snapshots(&self) {
        if let Err(e) =
            feed::pull_snapshots(self.transport.as_ref(), &self.store, &Collection::ALL).await
        {
            tracing::error!("Snapshot refresh failed: {}", e);
        }
    }
}
