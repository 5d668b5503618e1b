//! HTTP route definitions.

mod connectivity;
mod health;
mod queue;
mod snapshots;
mod sync;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(queue::routes())
        .merge(sync::routes())
        .merge(snapshots::routes())
        .merge(connectivity::routes())
}
