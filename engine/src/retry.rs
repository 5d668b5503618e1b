//! Retry counting, eviction, and backoff.
//!
//! A failed replay never aborts a pass. Instead the operation's retry count
//! grows until it reaches the policy's limit, at which point the operation is
//! evicted as a poison pill.

use crate::RetryCount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failed attempts after which an operation is dropped.
pub const DEFAULT_MAX_RETRIES: RetryCount = 5;

/// Backoff delay for an operation that has never failed.
pub const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Advisory delay before the next replay pass: `1000 * 2^retry_count` ms.
///
/// Saturates at `u64::MAX` instead of overflowing.
pub fn compute_retry_delay(retry_count: RetryCount) -> u64 {
    backoff_ms(BASE_RETRY_DELAY_MS, retry_count)
}

fn backoff_ms(base_ms: u64, retry_count: RetryCount) -> u64 {
    1u64.checked_shl(retry_count)
        .map_or(u64::MAX, |factor| base_ms.saturating_mul(factor))
}

/// How a transport failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
    /// Might succeed later (network partition, server error, throttling)
    Retryable,
    /// Will never succeed as sent (validation error, missing parent)
    Terminal,
}

/// Why an operation left the queue without succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictReason {
    RetriesExhausted,
    Terminal,
}

/// What to do with an operation after a failed replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Keep it queued with the incremented count.
    Retain { retry_count: RetryCount },
    /// Drop it permanently.
    Evict {
        retry_count: RetryCount,
        reason: EvictReason,
    },
}

impl FailureAction {
    pub fn retry_count(&self) -> RetryCount {
        match self {
            FailureAction::Retain { retry_count } | FailureAction::Evict { retry_count, .. } => {
                *retry_count
            }
        }
    }

    pub fn is_evict(&self) -> bool {
        matches!(self, FailureAction::Evict { .. })
    }
}

/// Retry and eviction policy for replay passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Failed attempts after which an operation is evicted
    pub max_retries: RetryCount,
    /// Delay for retry count 0, doubled per attempt
    pub base_delay_ms: u64,
    /// Evict terminal failures immediately instead of spending retries on them
    pub evict_terminal: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: BASE_RETRY_DELAY_MS,
            evict_terminal: false,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: RetryCount) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_evict_terminal(mut self, evict_terminal: bool) -> Self {
        self.evict_terminal = evict_terminal;
        self
    }

    /// Advisory backoff for an operation with the given retry count.
    pub fn retry_delay(&self, retry_count: RetryCount) -> Duration {
        Duration::from_millis(backoff_ms(self.base_delay_ms, retry_count))
    }

    /// Decide the fate of an operation whose replay just failed.
    ///
    /// `retry_count` is the count stored before this failure.
    pub fn on_failure(&self, retry_count: RetryCount, class: FailureClass) -> FailureAction {
        let retry_count = retry_count.saturating_add(1);

        if self.evict_terminal && class == FailureClass::Terminal {
            return FailureAction::Evict {
                retry_count,
                reason: EvictReason::Terminal,
            };
        }

        if retry_count >= self.max_retries {
            FailureAction::Evict {
                retry_count,
                reason: EvictReason::RetriesExhausted,
            }
        } else {
            FailureAction::Retain { retry_count }
        }
    }
}
