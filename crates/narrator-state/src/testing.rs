use std::sync::Arc;

use narrator_core::presentation::NoopResourceLoader;
use narrator_playback::config::PlayerConfig;
use narrator_playback::context::CommandContext;
use narrator_playback::events::PlayerStatus;
use narrator_playback::library::ScriptLibrary;
use narrator_playback::player::ScriptPlayer;
use narrator_playback::registry::CommandRegistry;
use narrator_test_support::{FixedClock, InMemorySlotStore, RecordingPresenter};

use crate::config::StateConfig;
use crate::manager::StateManager;

/// A player wired to a state manager the way a host composes them.
pub(crate) struct Engine {
    pub player: ScriptPlayer,
    pub state: Arc<StateManager>,
    pub library: Arc<ScriptLibrary>,
    pub presenter: Arc<RecordingPresenter>,
    pub slots: Arc<InMemorySlotStore>,
}

impl Engine {
    pub fn new(config: StateConfig) -> Self {
        let player_config = PlayerConfig::default();
        let presenter = Arc::new(RecordingPresenter::new());
        let library = Arc::new(ScriptLibrary::new());
        let slots = Arc::new(InMemorySlotStore::new());
        let context = Arc::new(CommandContext::new(
            presenter.clone(),
            Arc::new(NoopResourceLoader),
            &player_config,
        ));
        let state = Arc::new(
            StateManager::new(config, Arc::new(FixedClock::epoch()), slots.clone()).unwrap(),
        );
        for subsystem in context.subsystems() {
            state.register(subsystem).unwrap();
        }
        let player = ScriptPlayer::new(
            context,
            library.clone(),
            Arc::new(CommandRegistry::with_builtins()),
            player_config,
            state.clone(),
        );
        Self {
            player,
            state,
            library,
            presenter,
            slots,
        }
    }
}

pub(crate) fn is_waiting(status: PlayerStatus) -> bool {
    status == PlayerStatus::WaitingForInput
}

pub(crate) fn is_stopped(status: PlayerStatus) -> bool {
    status == PlayerStatus::Stopped
}
