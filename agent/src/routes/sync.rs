//! Sync endpoint routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{handle_sync, SyncOutcome};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync", post(sync_handler))
}

/// POST /sync - Replay the queue now.
async fn sync_handler(State(state): State<AppState>) -> Result<(StatusCode, Json<SyncOutcome>)> {
    let outcome = handle_sync(&state.queue).await?;
    let status = match outcome {
        SyncOutcome::Completed(_) => StatusCode::OK,
        SyncOutcome::Coalesced { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}
