//! Routes for script sources and hot reload.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, put},
};
use narrator_core::spot::PlaybackSpot;
use narrator_state::hot_reload::ReloadOutcome;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for PUT /{name}.
#[derive(Debug, Serialize)]
pub struct ReplaceScriptResponse {
    /// Script that was replaced.
    pub script: String,
    /// Lines in the new source.
    pub lines: usize,
    /// Per-line parse errors; the script is stored regardless.
    pub parse_errors: Vec<String>,
    /// Whether the played script was resynchronized.
    pub reloaded: bool,
    /// First changed line before the playback cursor.
    pub edit_line: Option<usize>,
    /// Where playback resumed after the reload.
    pub resumed_at: Option<PlaybackSpot>,
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct ScriptListResponse {
    /// Names of scripts held in memory.
    pub scripts: Vec<String>,
}

/// PUT /{name}
#[instrument(skip(state, source), fields(bytes = source.len()))]
async fn replace_script(
    State(state): State<AppState>,
    Path(name): Path<String>,
    source: String,
) -> Result<Json<ReplaceScriptResponse>, ApiError> {
    let script = state.library.insert_source(&name, &source);
    let parse_errors = script.parse_errors().map(ToString::to_string).collect();
    let lines = script.len();
    let outcome = state.reloader.reload(script).await?;

    let (reloaded, edit_line, resumed_at) = match outcome {
        ReloadOutcome::Ignored => (false, None, None),
        ReloadOutcome::Resumed(plan) => (true, plan.edit_line, Some(plan.resume)),
    };
    info!(script = %name, reloaded, "script source replaced");

    Ok(Json(ReplaceScriptResponse {
        script: name,
        lines,
        parse_errors,
        reloaded,
        edit_line,
        resumed_at,
    }))
}

/// GET /
async fn list_scripts(State(state): State<AppState>) -> Json<ScriptListResponse> {
    let mut scripts = state.library.names();
    scripts.sort();
    Json(ScriptListResponse { scripts })
}

/// Returns the router for scripts.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_scripts))
        .route("/{name}", put(replace_script))
}
