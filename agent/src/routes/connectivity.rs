//! Connectivity routes.
//!
//! Hosts with their own network signal push it here instead of relying on
//! the probe.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectivityState {
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectivityUpdate {
    pub online: bool,
    pub changed: bool,
}

/// Create connectivity routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/connectivity", get(get_handler).put(put_handler))
}

/// GET /connectivity
async fn get_handler(State(state): State<AppState>) -> Json<ConnectivityState> {
    Json(ConnectivityState {
        online: state.reachability.is_online(),
    })
}

/// PUT /connectivity - Record the host's reachability.
async fn put_handler(
    State(state): State<AppState>,
    Json(update): Json<ConnectivityState>,
) -> Json<ConnectivityUpdate> {
    let changed = state.reachability.set_online(update.online);
    Json(ConnectivityUpdate {
        online: update.online,
        changed,
    })
}
