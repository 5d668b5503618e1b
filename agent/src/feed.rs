//! Server snapshot feed.
//!
//! Fetches full collections from the remote and hands them to the local
//! snapshot store. A collection that cannot be fetched keeps its previous
//! cached contents.

use serde::Serialize;
use tether_engine::{Collection, SnapshotBatch};

use crate::error::Result;
use crate::snapshot_store::LocalSnapshotStore;
use crate::transport::Transport;

/// Outcome of one snapshot pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    /// Collections replaced in the local cache
    pub refreshed: Vec<Collection>,
    /// Collections left untouched because the fetch failed
    pub failed: Vec<Collection>,
    /// Entities written across refreshed collections
    pub entities: usize,
}

/// Fetch `collections` and replace the ones that arrived.
pub async fn pull_snapshots(
    transport: &dyn Transport,
    store: &LocalSnapshotStore,
    collections: &[Collection],
) -> Result<PullSummary> {
    let mut batch = SnapshotBatch::new();
    let mut summary = PullSummary::default();

    for &collection in collections {
        match transport.list(collection).await {
            Ok(entities) => {
                summary.entities += entities.len();
                summary.refreshed.push(collection);
                batch.insert(collection, entities);
            }
            Err(e) => {
                tracing::warn!(collection = %collection, "Snapshot fetch failed: {}", e);
                summary.failed.push(collection);
            }
        }
    }

    if !batch.is_empty() {
        store.sync_from_server(&batch).await?;
    }

    tracing::info!(
        refreshed = summary.refreshed.len(),
        failed = summary.failed.len(),
        entities = summary.entities,
        "Snapshot pull finished"
    );

    Ok(summary)
}
