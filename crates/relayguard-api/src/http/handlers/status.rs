//! Ops handlers: registry statistics and active connection listing.
//!
//! The ownership service already degrades storage failures to zeroed stats
//! and empty listings, so these handlers are infallible.

use axum::Json;
use axum::extract::State;

use crate::state::ServeState;

/// GET /api/v1/stats - Registry and detector statistics.
pub async fn get_stats(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let registry = state.app.router.ownership().stats().await;
    let detector = state.app.router.detector().stats();

    Json(serde_json::json!({
        "registry": registry,
        "detector": detector,
    }))
}

/// GET /api/v1/connections - Active ownership records, most recently
/// updated first.
pub async fn list_connections(State(state): State<ServeState>) -> Json<serde_json::Value> {
    let connections = state.app.router.ownership().list_active().await;
    Json(serde_json::json!({ "connections": connections }))
}
