//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::store::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: String,
    pub pending_reservations: usize,
}

/// GET /health: liveness plus which store this node serves.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.node.store_code().to_string(),
        pending_reservations: state.node.pending_reservations(),
    })
}
