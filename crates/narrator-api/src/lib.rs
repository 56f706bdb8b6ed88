//! Narrator — HTTP control surface.
//!
//! Composes a script player, a state manager and a hot reloader into one
//! [`state::AppState`] and exposes them through axum routers.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
