//! # Tether Engine
//!
//! Deterministic core logic for an offline mutation queue.
//!
//! A client records create/update/delete intents while it cannot reach the
//! backend, keeps them in a durable FIFO queue, and replays them once
//! connectivity returns. This crate holds the parts of that machinery that do
//! not touch IO: the typed collections, the queued operation model, the
//! mapping from an operation to a transport call, the retry/eviction policy,
//! and snapshot batch validation.
//!
//! ## Design Principles
//!
//! - **No IO**: storage, network and timers live in `tether-agent`
//! - **Deterministic**: the same inputs always produce the same decisions
//! - **Typed routing**: collections are an enum, never a bare string
//!
//! ## Core Concepts
//!
//! ### Intents and queued operations
//!
//! An [`Intent`] is a validated mutation that has not been persisted yet.
//! Once the store assigns it an id it becomes a [`QueuedOperation`], which
//! maps to exactly one [`ReplayRequest`] against the remote transport.
//!
//! ### Retry policy
//!
//! A failed replay increments the operation's retry count. The
//! [`RetryPolicy`] decides whether the operation stays queued or is evicted
//! as a poison pill, and [`compute_retry_delay`] gives the advisory backoff
//! a scheduler should wait before the next pass.
//!
//! ### Snapshots
//!
//! A [`SnapshotBatch`] carries full-replacement contents for one or more
//! collections. Each entity must carry a stable identifier.
//!
//! ## Quick Start
//!
//! ```rust
//! use tether_engine::{
//!     compute_retry_delay, Collection, FailureAction, FailureClass, Intent, OperationKind,
//!     QueuedOperation, ReplayRequest, RetryPolicy,
//! };
//! use serde_json::json;
//!
//! // 1. Validate a mutation intent
//! let intent = Intent::new(
//!     OperationKind::Update,
//!     Collection::Participants,
//!     json!({"id": 7, "name": "Ada"}),
//! )
//! .unwrap();
//!
//! // 2. The store turns it into a queued operation
//! let op = QueuedOperation::from_intent(1, intent, 1706745600000);
//!
//! // 3. Map it to a transport call
//! let request = op.request().unwrap();
//! assert!(matches!(request, ReplayRequest::Update { .. }));
//! assert_eq!(request.path(), "/participants/7");
//!
//! // 4. Decide what happens after a failed replay
//! let policy = RetryPolicy::default();
//! let action = policy.on_failure(op.retry_count, FailureClass::Retryable);
//! assert_eq!(action, FailureAction::Retain { retry_count: 1 });
//! assert_eq!(compute_retry_delay(3), 8000);
//! ```

pub mod collection;
pub mod error;
pub mod operation;
pub mod report;
pub mod retry;
pub mod snapshot;

// Re-export main types at crate root
pub use collection::Collection;
pub use error::Error;
pub use operation::{EntityId, Intent, OperationKind, QueuedOperation, ReplayRequest};
pub use report::PassReport;
pub use retry::{
    compute_retry_delay, EvictReason, FailureAction, FailureClass, RetryPolicy,
    BASE_RETRY_DELAY_MS, DEFAULT_MAX_RETRIES,
};
pub use snapshot::{SnapshotBatch, SnapshotEntity};

/// Type aliases for clarity
pub type OperationId = i64;
pub type Timestamp = i64;
pub type RetryCount = u32;
