//! A presenter that writes to the log.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_core::presentation::{ChoiceOption, Presenter};
use tracing::info;

/// Logs output instead of rendering it. Used by headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

#[async_trait]
impl Presenter for TracingPresenter {
    async fn print(
        &self,
        author: Option<&str>,
        text: &str,
        _cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        info!(author = author.unwrap_or_default(), text, "print");
        Ok(())
    }

    async fn play_voice(
        &self,
        path: &str,
        volume: f64,
        _cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        info!(path, volume, "voice");
        Ok(())
    }

    fn show_choices(&self, choices: &[ChoiceOption]) {
        let summaries: Vec<&str> = choices.iter().map(|choice| choice.summary.as_str()).collect();
        info!(?summaries, "choices");
    }
}
