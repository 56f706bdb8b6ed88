//! Shared application state.

use std::sync::Arc;

use narrator_core::clock::Clock;
use narrator_core::error::EngineError;
use narrator_core::presentation::{Presenter, ResourceLoader};
use narrator_core::repository::SaveSlotStore;
use narrator_playback::context::CommandContext;
use narrator_playback::library::ScriptLibrary;
use narrator_playback::player::ScriptPlayer;
use narrator_playback::registry::CommandRegistry;
use narrator_state::hot_reload::HotReloader;
use narrator_state::manager::StateManager;

use crate::config::EngineConfig;

/// Collaborators the engine is assembled from.
pub struct EngineParts {
    /// Tunables.
    pub config: EngineConfig,
    /// Script source.
    pub library: Arc<ScriptLibrary>,
    /// Where text and voices go.
    pub presenter: Arc<dyn Presenter>,
    /// Resource holds for preloading.
    pub resources: Arc<dyn ResourceLoader>,
    /// Save slot persistence.
    pub slots: Arc<dyn SaveSlotStore>,
    /// Timestamp source for snapshots and saves.
    pub clock: Arc<dyn Clock>,
}

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The script player.
    pub player: ScriptPlayer,
    /// Snapshots, rollback and save slots.
    pub state: Arc<StateManager>,
    /// Scripts by name.
    pub library: Arc<ScriptLibrary>,
    /// Resynchronizes playback after a script is replaced.
    pub reloader: Arc<HotReloader>,
}

impl AppState {
    /// Wires the engine: every built-in service is registered with the
    /// state manager, which in turn hooks into the player.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an invalid state config.
    pub fn new(parts: EngineParts) -> Result<Self, EngineError> {
        let EngineParts {
            config,
            library,
            presenter,
            resources,
            slots,
            clock,
        } = parts;

        let context = Arc::new(CommandContext::new(presenter, resources, &config.player));
        let state = Arc::new(StateManager::new(config.state, clock, slots)?);
        for subsystem in context.subsystems() {
            state.register(subsystem)?;
        }
        let player = ScriptPlayer::new(
            context,
            library.clone(),
            Arc::new(CommandRegistry::with_builtins()),
            config.player,
            state.clone(),
        );
        let reloader = HotReloader::attach(player.clone(), state.clone());

        Ok(Self {
            player,
            state,
            library,
            reloader,
        })
    }
}
