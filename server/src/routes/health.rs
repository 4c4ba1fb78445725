//! Liveness endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub games: usize,
    pub open_sessions: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(banner))
}

/// GET /health - Build version plus what the merge service currently holds.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        games: state.registry.len(),
        open_sessions: state.sessions.session_count(),
    })
}

async fn banner() -> &'static str {
    "FRC Stats Merge Server"
}
