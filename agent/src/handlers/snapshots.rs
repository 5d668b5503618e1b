//! Snapshot handlers - read and refresh the local cache.

use std::str::FromStr;

use tether_engine::{Collection, SnapshotBatch};

use crate::error::{AppError, Result};
use crate::handlers::ClearResponse;
use crate::snapshot_store::LocalSnapshotStore;

/// Resolve a collection from a URL segment such as `activity-types`.
pub fn parse_collection(segment: &str) -> Result<Collection> {
    Collection::from_str(segment)
        .map_err(|_| AppError::NotFound(format!("Unknown collection: {segment}")))
}

/// Cached entities for the collection named by `segment`.
pub async fn handle_get_snapshot(
    store: &LocalSnapshotStore,
    segment: &str,
) -> Result<Vec<serde_json::Value>> {
    let collection = parse_collection(segment)?;
    Ok(store.get_local_data(collection).await)
}

/// Replace the collections named in `batch`.
pub async fn handle_replace_snapshots(
    store: &LocalSnapshotStore,
    batch: SnapshotBatch,
) -> Result<()> {
    store.sync_from_server(&batch).await?;
    tracing::info!(
        collections = batch.len(),
        entities = batch.entity_count(),
        "Snapshots replaced by host"
    );
    Ok(())
}

pub async fn handle_clear_snapshots(store: &LocalSnapshotStore) -> Result<ClearResponse> {
    let cleared = store.clear_cache().await?;
    Ok(ClearResponse { cleared })
}
