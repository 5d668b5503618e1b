//! Local snapshot cache of server-owned collections.
//!
//! Each collection is replaced wholesale by [`LocalSnapshotStore::sync_from_server`].
//! Replayed mutations never touch the cache; only a fresh sync does.

use tether_engine::{Collection, SnapshotBatch};

use crate::db::{self, Pool};
use crate::error::Result;

/// Durable read cache for offline rendering.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    pool: Pool,
}

impl LocalSnapshotStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Replace every collection named in the batch.
    ///
    /// The whole batch is validated before anything is written. Each
    /// collection swap is atomic; collections absent from the batch are left
    /// untouched.
    pub async fn sync_from_server(&self, batch: &SnapshotBatch) -> Result<()> {
        let collections = batch.entities()?;

        for (collection, entities) in &collections {
            db::replace_collection(&self.pool, *collection, entities).await?;
            tracing::debug!(
                collection = %collection,
                entities = entities.len(),
                "Snapshot replaced"
            );
        }

        Ok(())
    }

    /// Current cached contents of one collection, in snapshot order.
    ///
    /// Returns an empty list when the collection is empty or cannot be read.
    pub async fn get_local_data(&self, collection: Collection) -> Vec<serde_json::Value> {
        let rows = match db::get_collection(&self.pool, collection).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(collection = %collection, "Failed to read snapshot: {}", e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| match row.to_value() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        entity_id = %row.entity_id,
                        "Skipping unreadable cached entity: {}",
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Number of cached entities in a collection.
    pub async fn count(&self, collection: Collection) -> Result<usize> {
        let count = db::count_collection(&self.pool, collection).await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Empty every snapshot collection. The operation queue is not touched.
    pub async fn clear_cache(&self) -> Result<u64> {
        let cleared = db::clear_snapshots(&self.pool).await?;
        tracing::info!(cleared, "Snapshot cache cleared");
        Ok(cleared)
    }
}
