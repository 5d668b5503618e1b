//! Snapshot cache routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tether_engine::SnapshotBatch;

use crate::error::Result;
use crate::handlers::{
    handle_clear_snapshots, handle_get_snapshot, handle_replace_snapshots, ClearResponse,
};
use crate::AppState;

/// Create snapshot routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/snapshots", put(replace_handler).delete(clear_handler))
        .route("/snapshots/{collection}", get(get_handler))
}

/// GET /snapshots/{collection} - Cached entities for offline rendering.
async fn get_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>> {
    Ok(Json(handle_get_snapshot(&state.snapshots, &collection).await?))
}

/// PUT /snapshots - Replace collections with a fresh server snapshot.
async fn replace_handler(
    State(state): State<AppState>,
    Json(batch): Json<SnapshotBatch>,
) -> Result<StatusCode> {
    handle_replace_snapshots(&state.snapshots, batch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /snapshots - Empty the cache. The queue is left alone.
async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    Ok(Json(handle_clear_snapshots(&state.snapshots).await?))
}
