//! Operation queue routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tether_engine::QueuedOperation;

use crate::error::Result;
use crate::handlers::{
    handle_clear_queue, handle_enqueue, handle_status, ClearResponse, EnqueueRequest,
    EnqueueResponse, QueueStatus,
};
use crate::AppState;

/// Create queue routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/queue",
            get(status_handler)
                .post(enqueue_handler)
                .delete(clear_handler),
        )
        .route("/queue/operations", get(operations_handler))
}

/// GET /queue - Pending count.
async fn status_handler(State(state): State<AppState>) -> Json<QueueStatus> {
    Json(handle_status(&state.queue).await)
}

/// GET /queue/operations - Pending operations in replay order.
async fn operations_handler(State(state): State<AppState>) -> Result<Json<Vec<QueuedOperation>>> {
    Ok(Json(state.queue.pending().await?))
}

/// POST /queue - Enqueue a mutation.
async fn enqueue_handler(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let response = handle_enqueue(&state.queue, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /queue - Discard every pending operation.
async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    Ok(Json(handle_clear_queue(&state.queue).await?))
}
