//! Player status and notifications.

use std::sync::Arc;

use narrator_core::spot::PlaybackSpot;
use narrator_script::Script;
use serde::Serialize;
use uuid::Uuid;

/// Position of the player in its state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Nothing has been played yet.
    Idle,
    /// Dispatching commands.
    Playing,
    /// Halted until a continue signal arrives.
    WaitingForInput,
    /// Finished, stopped, or cancelled.
    Stopped,
}

/// Notification emitted by the player, in dispatch order.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A `play` call replaced the active playlist. Emitted before the first
    /// command runs.
    PlayStarted {
        /// The script being played.
        script: Arc<Script>,
        /// Correlates logs of this play invocation.
        play_id: Uuid,
        /// Playlist index playback starts from.
        start_index: usize,
    },
    /// A command is about to execute.
    CommandStarted {
        /// Where the command lives.
        spot: PlaybackSpot,
        /// Its registered name.
        command_type: &'static str,
    },
    /// A command failed; playback continued past it.
    CommandFailed {
        /// Where the command lives.
        spot: PlaybackSpot,
        /// Error description.
        message: String,
    },
    /// The player is waiting for a continue signal.
    WaitingForInput {
        /// The command that requested the wait.
        spot: PlaybackSpot,
    },
    /// Playback ran off the end of the playlist or hit `@stop`.
    Finished {
        /// Script that finished.
        script_name: String,
    },
}
