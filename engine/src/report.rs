//! Replay pass outcome counters.

use serde::{Deserialize, Serialize};

/// Aggregate result of one or more replay passes.
///
/// `failed` counts every failed attempt, including the ones that led to
/// eviction; `evicted` is the subset that left the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub success: usize,
    pub failed: usize,
    pub evicted: usize,
}

impl PassReport {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, evicted: bool) {
        self.failed += 1;
        if evicted {
            self.evicted += 1;
        }
    }

    /// Number of operations attempted.
    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }

    /// True when no attempt failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: &PassReport) {
        self.success += other.success;
        self.failed += other.failed;
        self.evicted += other.evicted;
    }
}
