//! Queue handlers - enqueue, inspect, clear and replay operations.

use serde::{Deserialize, Serialize};
use tether_engine::{Collection, OperationId, OperationKind, PassReport};

use crate::error::Result;
use crate::queue::OperationQueue;

/// Request body for enqueueing a mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub kind: OperationKind,
    pub collection: Collection,
    pub payload: serde_json::Value,
}

/// Response for an accepted enqueue.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub id: OperationId,
}

/// Queue status.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub length: usize,
    pub replaying: bool,
}

/// Response for a bulk clear.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub cleared: u64,
}

/// Result of a sync request.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SyncOutcome {
    /// This request drove the replay; totals of every pass it ran.
    Completed(PassReport),
    /// Another replay was running and will pick up this trigger.
    Coalesced { coalesced: bool },
}

/// Validate and persist one mutation.
pub async fn handle_enqueue(
    queue: &OperationQueue,
    request: EnqueueRequest,
) -> Result<EnqueueResponse> {
    let id = queue
        .enqueue(request.kind, request.collection, request.payload)
        .await?;
    Ok(EnqueueResponse { id })
}

pub async fn handle_status(queue: &OperationQueue) -> QueueStatus {
    QueueStatus {
        length: queue.queue_length().await,
        replaying: queue.is_replaying(),
    }
}

pub async fn handle_clear_queue(queue: &OperationQueue) -> Result<ClearResponse> {
    let cleared = queue.clear_queue().await?;
    Ok(ClearResponse { cleared })
}

/// Run a replay now, or hand the trigger to the replay already running.
pub async fn handle_sync(queue: &OperationQueue) -> Result<SyncOutcome> {
    let outcome = match queue.replay().await? {
        Some(report) => {
            tracing::info!(
                success = report.success,
                failed = report.failed,
                evicted = report.evicted,
                "Manual replay finished"
            );
            SyncOutcome::Completed(report)
        }
        None => SyncOutcome::Coalesced { coalesced: true },
    };
    Ok(outcome)
}
