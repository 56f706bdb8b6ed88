//! Route modules organized by engine concern.

pub mod engine_state;
pub mod health;
pub mod player;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// The full application router, with every route module mounted.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/player", player::router())
        .nest("/api/v1/state", engine_state::router())
        .nest("/api/v1/scripts", scripts::router())
        .with_state(state)
}
