//! Playback modes and timed delays.

use std::time::Duration;

use narrator_core::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::PlayerConfig;

/// Orthogonal playback mode. Modes change how long the player lingers, never
/// the order of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Wait for input and honour delays.
    #[default]
    Normal,
    /// Continue past input waits and shorten delays.
    Skip,
    /// Continue past input waits after a delay.
    AutoPlay,
    /// Hold before dispatching the next command.
    Paused,
}

/// Shared mode state plus the delay primitive commands use.
#[derive(Debug)]
pub struct Pacing {
    mode: watch::Sender<PlaybackMode>,
    skip_time_scale: f64,
    auto_play_delay: Duration,
}

impl Pacing {
    /// Creates pacing in `Normal` mode.
    #[must_use]
    pub fn new(config: &PlayerConfig) -> Self {
        let (mode, _rx) = watch::channel(PlaybackMode::Normal);
        Self {
            mode,
            skip_time_scale: config.skip_time_scale.max(1.0),
            auto_play_delay: seconds(config.min_auto_play_delay_secs),
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        *self.mode.borrow()
    }

    /// Switches mode, waking anything waiting on a mode change.
    pub fn set_mode(&self, mode: PlaybackMode) {
        self.mode.send_replace(mode);
    }

    /// Receiver for mode changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackMode> {
        self.mode.subscribe()
    }

    /// How long auto-play lingers on an input wait.
    #[must_use]
    pub fn auto_play_delay(&self) -> Duration {
        self.auto_play_delay
    }

    /// Sleeps for `secs` (divided by the skip scale while skipping). Returns
    /// `false` when cancelled first.
    pub async fn delay(&self, secs: f64, cancel: &CancelToken) -> bool {
        let secs = if self.mode() == PlaybackMode::Skip {
            secs / self.skip_time_scale
        } else {
            secs
        };
        tokio::select! {
            () = tokio::time::sleep(seconds(secs)) => true,
            () = cancel.cancelled() => false,
        }
    }
}

fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
