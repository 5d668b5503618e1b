//! Durable operation queue and replay passes.
//!
//! Mutations are appended to the `queued_operations` table and replayed
//! against the remote transport in FIFO order. A pass never stops on a
//! failed operation: the failure is counted against that operation's retry
//! budget and the pass moves on to the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tether_engine::{
    Collection, FailureAction, Intent, OperationId, OperationKind, PassReport, QueuedOperation,
    RetryPolicy,
};
use tokio::sync::Mutex;

use crate::db::{self, Pool, StoredOperation};
use crate::error::Result;
use crate::transport::{self, Transport};

/// The offline mutation queue.
///
/// Thread-safe and can be shared across tasks via `Arc`.
pub struct OperationQueue {
    pool: Pool,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    /// Serializes passes so two never interleave on the queue table.
    pass_lock: Mutex<()>,
    /// Set while `replay` is driving passes.
    in_flight: AtomicBool,
    /// A trigger arrived while a pass was running.
    rerun: AtomicBool,
}

impl OperationQueue {
    /// Create a queue over an already migrated pool.
    pub fn new(pool: Pool, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            pool,
            transport,
            policy,
            pass_lock: Mutex::new(()),
            in_flight: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
        }
    }

    /// Create a new queue wrapped in Arc for sharing.
    pub fn new_shared(pool: Pool, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Arc<Self> {
        Arc::new(Self::new(pool, transport, policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Append a mutation intent.
    ///
    /// Invalid payloads and storage errors are returned to the caller, which
    /// decides on a fallback.
    pub async fn enqueue(
        &self,
        kind: OperationKind,
        collection: Collection,
        payload: serde_json::Value,
    ) -> Result<OperationId> {
        let intent = Intent::new(kind, collection, payload)?;
        self.enqueue_intent(intent).await
    }

    /// Append an already validated intent.
    pub async fn enqueue_intent(&self, intent: Intent) -> Result<OperationId> {
        let enqueued_at = chrono::Utc::now().timestamp_millis();
        let id = db::insert_operation(&self.pool, &intent, enqueued_at).await?;

        tracing::debug!(
            op_id = id,
            kind = %intent.kind,
            collection = %intent.collection,
            "Operation enqueued"
        );

        Ok(id)
    }

    /// Pending operations in replay order.
    pub async fn pending(&self) -> Result<Vec<QueuedOperation>> {
        let rows = db::list_operations(&self.pool).await?;
        let mut operations = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.to_operation() {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(op_id = row.id, "Skipping unreadable queued operation: {}", e);
                }
            }
        }
        Ok(operations)
    }

    /// Number of pending operations. Returns 0 if the table cannot be read.
    pub async fn queue_length(&self) -> usize {
        match db::count_operations(&self.pool).await {
            Ok(count) => usize::try_from(count).unwrap_or(0),
            Err(e) => {
                tracing::warn!("Failed to count queued operations: {}", e);
                0
            }
        }
    }

    /// Discard every pending operation. Returns how many were removed.
    pub async fn clear_queue(&self) -> Result<u64> {
        let cleared = db::clear_operations(&self.pool).await?;
        tracing::info!(cleared, "Operation queue cleared");
        Ok(cleared)
    }

    /// Advisory wait before the next pass for an operation with this retry count.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        self.policy.retry_delay(retry_count)
    }

    /// Run one replay pass over the operations queued at its start.
    ///
    /// Operations are sent one at a time, in FIFO order. A storage error
    /// aborts the pass; transport errors never do.
    pub async fn process_queue(&self) -> Result<PassReport> {
        let _pass = self.pass_lock.lock().await;

        let rows = db::list_operations(&self.pool).await?;
        let mut report = PassReport::default();

        if rows.is_empty() {
            return Ok(report);
        }

        tracing::info!(pending = rows.len(), "Starting replay pass");

        for row in &rows {
            self.replay_one(row, &mut report).await?;
        }

        tracing::info!(
            success = report.success,
            failed = report.failed,
            evicted = report.evicted,
            "Replay pass finished"
        );

        Ok(report)
    }

    async fn replay_one(&self, row: &StoredOperation, report: &mut PassReport) -> Result<()> {
        // A row that cannot be mapped to a request will never replay.
        let (op, request) = match row
            .to_operation()
            .and_then(|op| op.request().map(|request| (op, request)))
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(op_id = row.id, "Evicting unreplayable operation: {}", e);
                db::delete_operation(&self.pool, row.id).await?;
                report.record_failure(true);
                return Ok(());
            }
        };

        match transport::dispatch(self.transport.as_ref(), &request).await {
            Ok(()) => {
                db::delete_operation(&self.pool, op.id).await?;
                report.record_success();
                tracing::debug!(
                    op_id = op.id,
                    kind = %op.kind,
                    collection = %op.collection,
                    "Operation replayed"
                );
            }
            Err(e) => {
                let action = self.policy.on_failure(op.retry_count, e.class());
                self.record_failure(&op, action).await?;
                report.record_failure(action.is_evict());

                match action {
                    FailureAction::Retain { retry_count } => tracing::warn!(
                        op_id = op.id,
                        retry_count,
                        error = %e,
                        "Replay failed, operation kept for retry"
                    ),
                    FailureAction::Evict {
                        retry_count,
                        reason,
                    } => tracing::error!(
                        op_id = op.id,
                        retry_count,
                        ?reason,
                        error = %e,
                        "Replay failed, operation evicted"
                    ),
                }
            }
        }

        Ok(())
    }

    async fn record_failure(&self, op: &QueuedOperation, action: FailureAction) -> Result<()> {
        match action {
            FailureAction::Retain { retry_count } => {
                db::update_retry_count(&self.pool, op.id, retry_count).await?;
            }
            FailureAction::Evict { .. } => {
                db::delete_operation(&self.pool, op.id).await?;
            }
        }
        Ok(())
    }

    /// Run passes with overlapping triggers coalesced.
    ///
    /// If a pass is already being driven by another caller this returns
    /// `Ok(None)` and that caller runs one more pass after its current one.
    /// Otherwise runs until no trigger is outstanding and returns the summed
    /// report.
    pub async fn replay(&self) -> Result<Option<PassReport>> {
        // The trigger is published before claiming the slot so a driver that
        // is releasing it always observes the trigger.
        self.rerun.store(true, Ordering::SeqCst);
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("Replay already in flight, trigger coalesced");
            return Ok(None);
        }

        let mut total = PassReport::default();
        loop {
            self.rerun.store(false, Ordering::SeqCst);

            match self.process_queue().await {
                Ok(report) => total.merge(&report),
                Err(e) => {
                    self.in_flight.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }

            if self.rerun.load(Ordering::SeqCst) {
                continue;
            }

            self.in_flight.store(false, Ordering::SeqCst);

            // A trigger may have landed between the check and the release.
            if !self.rerun.load(Ordering::SeqCst) || self.in_flight.swap(true, Ordering::SeqCst) {
                break;
            }
        }

        Ok(Some(total))
    }

    /// Whether `replay` is currently driving a pass.
    pub fn is_replaying(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}
