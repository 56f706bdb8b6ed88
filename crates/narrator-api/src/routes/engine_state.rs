//! Routes for rollback, save slots and state reset.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use narrator_core::error::EngineError;
use narrator_core::snapshot::StateSnapshot;
use narrator_core::spot::PlaybackSpot;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::routes::player::StatusResponse;
use crate::state::AppState;

/// Request body for POST /rollback.
#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    /// Line to roll back to.
    pub line_index: usize,
    /// Script the line belongs to; the played script when absent.
    pub script: Option<String>,
}

/// Response body for rollback and load.
#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    /// Where playback resumed.
    pub spot: PlaybackSpot,
}

/// Request body for POST /save and POST /load.
#[derive(Debug, Default, Deserialize)]
pub struct SlotRequest {
    /// Slot id; the quick save rotation when absent.
    pub slot: Option<String>,
}

/// Response body for POST /save.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Slot written.
    pub slot: String,
}

/// Request body for POST /reset.
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    /// Subsystems to leave alone; the configured exclusions when absent.
    pub excluded: Option<Vec<String>>,
    /// Script to play once the reset is done.
    pub script: Option<String>,
    /// Label in `script` to start from.
    pub label: Option<String>,
}

/// Response body for GET /saves.
#[derive(Debug, Serialize)]
pub struct SavesResponse {
    /// Every stored slot id.
    pub slots: Vec<String>,
    /// Whether any regular or quick save exists.
    pub any_save_exists: bool,
}

/// POST /rollback
#[instrument(skip(state))]
async fn rollback(
    State(state): State<AppState>,
    Json(request): Json<RollbackRequest>,
) -> Result<Json<ResumeResponse>, ApiError> {
    let script = request
        .script
        .or_else(|| state.player.played_script().map(|s| s.name().to_owned()))
        .ok_or_else(|| EngineError::Validation("nothing has been played yet".to_owned()))?;
    let line_index = request.line_index;
    let spot = state
        .state
        .rollback(
            move |snapshot: &StateSnapshot| {
                snapshot.spot.line_index == line_index && snapshot.spot.script_name == script
            },
            &state.player,
        )
        .await?;

    Ok(Json(ResumeResponse { spot }))
}

/// POST /save
#[instrument(skip(state))]
async fn save(
    State(state): State<AppState>,
    Json(request): Json<SlotRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let slot = match request.slot {
        Some(slot) => {
            state.state.save_game(&slot).await?;
            slot
        }
        None => state.state.quick_save().await?,
    };

    Ok(Json(SaveResponse { slot }))
}

/// POST /load
#[instrument(skip(state))]
async fn load(
    State(state): State<AppState>,
    Json(request): Json<SlotRequest>,
) -> Result<Json<ResumeResponse>, ApiError> {
    let spot = match request.slot {
        Some(slot) => state.state.load_game(&slot, &state.player).await?,
        None => state.state.quick_load(&state.player).await?,
    };

    Ok(Json(ResumeResponse { spot }))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.player.stop();
    let player = state.player.clone();
    let ResetRequest {
        excluded,
        script,
        label,
    } = request;
    state
        .state
        .reset_state(excluded.as_deref(), || async move {
            if let Some(script) = script {
                let play_id = player.preload_and_play(&script, label.as_deref()).await?;
                info!(%play_id, script = %script, "playing after reset");
            }
            Ok(())
        })
        .await?;

    Ok(Json(StatusResponse::of(&state)))
}

/// GET /saves
async fn list_saves(State(state): State<AppState>) -> Result<Json<SavesResponse>, ApiError> {
    Ok(Json(SavesResponse {
        slots: state.state.list_saves().await?,
        any_save_exists: state.state.any_save_exists().await?,
    }))
}

/// DELETE /saves/{slot}
#[instrument(skip(state))]
async fn delete_save(
    State(state): State<AppState>,
    Path(slot): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.state.delete_save(&slot).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for state management.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rollback", post(rollback))
        .route("/save", post(save))
        .route("/load", post(load))
        .route("/reset", post(reset))
        .route("/saves", get(list_saves))
        .route("/saves/{slot}", delete(delete_save))
}
