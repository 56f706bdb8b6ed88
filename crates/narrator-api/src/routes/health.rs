//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use narrator_playback::events::PlayerStatus;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Where the script player currently is.
    pub player: PlayerStatus,
    /// Scripts held in memory.
    pub scripts_loaded: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        player: state.player.status(),
        scripts_loaded: state.library.names().len(),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
