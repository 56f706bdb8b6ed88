//! Routes driving the script player.

use axum::extract::State;
use axum::{
    Json, Router,
    routing::{get, post},
};
use narrator_core::presentation::ChoiceOption;
use narrator_core::spot::PlaybackSpot;
use narrator_playback::events::PlayerStatus;
use narrator_playback::pacing::PlaybackMode;
use narrator_playback::services::backlog::BacklogMessage;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /play.
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    /// Script to load.
    pub script: String,
    /// Label to start from; the top of the script when absent.
    pub label: Option<String>,
}

/// Response body for POST /play.
#[derive(Debug, Serialize)]
pub struct PlayResponse {
    /// Correlates this play with its log lines.
    pub play_id: Uuid,
}

/// Request body for POST /mode.
#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    /// New playback mode.
    pub mode: PlaybackMode,
}

/// Request body for POST /choose.
#[derive(Debug, Deserialize)]
pub struct ChooseRequest {
    /// Index into the pending choices.
    pub index: usize,
}

/// Response body for POST /continue.
#[derive(Debug, Serialize)]
pub struct ContinueResponse {
    /// Whether a waiting player was released.
    pub continued: bool,
}

/// Snapshot of what the player is doing.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Player status.
    pub status: PlayerStatus,
    /// Playback mode.
    pub mode: PlaybackMode,
    /// Name of the played script.
    pub script: Option<String>,
    /// Spot of the played command.
    pub played_spot: Option<PlaybackSpot>,
    /// Current play invocation.
    pub play_id: Option<Uuid>,
    /// Choices waiting for a pick.
    pub choices: Vec<ChoiceOption>,
    /// Printed messages, oldest first.
    pub backlog: Vec<BacklogMessage>,
    /// Snapshots available for rollback.
    pub rollback_steps: usize,
}

impl StatusResponse {
    /// Reads the current engine status.
    #[must_use]
    pub fn of(state: &AppState) -> Self {
        let player = &state.player;
        let context = player.context();
        Self {
            status: player.status(),
            mode: player.mode(),
            script: player.played_script().map(|script| script.name().to_owned()),
            played_spot: player.played_spot(),
            play_id: player.play_id(),
            choices: context.choices().pending(),
            backlog: context.backlog().messages(),
            rollback_steps: state.state.rollback_steps(),
        }
    }
}

/// POST /play
#[instrument(skip(state, request), fields(script = %request.script))]
async fn play(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> Result<Json<PlayResponse>, ApiError> {
    let play_id = state
        .player
        .preload_and_play(&request.script, request.label.as_deref())
        .await?;

    info!(%play_id, "play requested");

    Ok(Json(PlayResponse { play_id }))
}

/// POST /continue
#[instrument(skip(state))]
async fn continue_input(State(state): State<AppState>) -> Json<ContinueResponse> {
    Json(ContinueResponse {
        continued: state.player.continue_input(),
    })
}

/// POST /mode
#[instrument(skip(state))]
async fn set_mode(
    State(state): State<AppState>,
    Json(request): Json<ModeRequest>,
) -> Json<StatusResponse> {
    state.player.set_mode(request.mode);
    Json(StatusResponse::of(&state))
}

/// POST /stop
#[instrument(skip(state))]
async fn stop(State(state): State<AppState>) -> Json<StatusResponse> {
    state.player.stop();
    Json(StatusResponse::of(&state))
}

/// POST /choose
#[instrument(skip(state))]
async fn choose(
    State(state): State<AppState>,
    Json(request): Json<ChooseRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.player.select_choice(request.index).await?;
    Ok(Json(StatusResponse::of(&state)))
}

/// GET /status
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::of(&state))
}

/// Returns the router for the player.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/play", post(play))
        .route("/continue", post(continue_input))
        .route("/mode", post(set_mode))
        .route("/stop", post(stop))
        .route("/choose", post(choose))
        .route("/status", get(status))
}
