//! Presentation-layer collaborators.
//!
//! Text panels, audio and choice buttons live outside the engine. Commands
//! reach them only through these traits, injected via the command context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::spot::PlaybackSpot;

/// A choice option offered to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Text shown for the choice.
    pub summary: String,
    /// Navigation path (`Script.Label`, `.Label`) taken when selected.
    pub goto: Option<String>,
    /// Variable assignments applied when selected.
    pub set_expression: Option<String>,
    /// Resource path of a custom button, if any.
    pub button: Option<String>,
    /// The command that added the option.
    pub spot: PlaybackSpot,
}

/// Renders narrative output.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Reveals a line of text. Should return early when `cancel` fires.
    async fn print(
        &self,
        author: Option<&str>,
        text: &str,
        cancel: &CancelToken,
    ) -> Result<(), EngineError>;

    /// Plays a voice clip until it finishes or `cancel` fires.
    async fn play_voice(
        &self,
        path: &str,
        volume: f64,
        cancel: &CancelToken,
    ) -> Result<(), EngineError>;

    /// Shows the currently pending choices.
    fn show_choices(&self, choices: &[ChoiceOption]);
}

/// Holds external resources ahead of execution.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Loads and pins `path` on behalf of the command at `holder`.
    async fn hold(&self, path: &str, holder: &PlaybackSpot) -> Result<(), EngineError>;

    /// Drops the hold `holder` has on `path`.
    fn release(&self, path: &str, holder: &PlaybackSpot);
}

/// Resource loader for hosts without preloading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResourceLoader;

#[async_trait]
impl ResourceLoader for NoopResourceLoader {
    async fn hold(&self, _path: &str, _holder: &PlaybackSpot) -> Result<(), EngineError> {
        Ok(())
    }

    fn release(&self, _path: &str, _holder: &PlaybackSpot) {}
}
