//! Tether Agent - on-device offline queue and snapshot cache.
//!
//! Mutations made while the remote is unreachable are persisted to a local
//! SQLite queue and replayed in order once connectivity returns. Server
//! collections are cached locally so the UI can render offline. A small
//! HTTP API exposes both to the host application.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod queue;
pub mod routes;
pub mod scheduler;
pub mod snapshot_store;
pub mod transport;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::connectivity::Reachability;
use crate::queue::OperationQueue;
use crate::snapshot_store::LocalSnapshotStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<OperationQueue>,
    pub snapshots: LocalSnapshotStore,
    pub reachability: Arc<Reachability>,
    pub config: Arc<Config>,
}

/// Build the local API router with tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
