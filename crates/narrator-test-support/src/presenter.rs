//! Recording presentation doubles.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_core::presentation::{ChoiceOption, Presenter, ResourceLoader};
use narrator_core::spot::PlaybackSpot;

/// A presenter that records everything it is asked to show. Prints complete
/// immediately unless a reveal delay is configured.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    reveal_delay: Option<Duration>,
    voice_duration: Option<Duration>,
    printed: Mutex<Vec<(Option<String>, String)>>,
    voices: Mutex<Vec<String>>,
    shown_choices: Mutex<Vec<Vec<ChoiceOption>>>,
}

impl RecordingPresenter {
    /// Creates a presenter with instant prints and voices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every print take `delay` unless cancelled.
    #[must_use]
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = Some(delay);
        self
    }

    /// Makes every voice clip last `duration` unless cancelled.
    #[must_use]
    pub fn with_voice_duration(mut self, duration: Duration) -> Self {
        self.voice_duration = Some(duration);
        self
    }

    /// Printed `(author, text)` pairs in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn printed(&self) -> Vec<(Option<String>, String)> {
        self.printed.lock().unwrap().clone()
    }

    /// Printed texts only.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn printed_texts(&self) -> Vec<String> {
        self.printed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Voice clip paths in play order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn voices(&self) -> Vec<String> {
        self.voices.lock().unwrap().clone()
    }

    /// Every choice list that was shown.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn shown_choices(&self) -> Vec<Vec<ChoiceOption>> {
        self.shown_choices.lock().unwrap().clone()
    }
}

async fn sleep_unless_cancelled(duration: Option<Duration>, cancel: &CancelToken) {
    if let Some(duration) = duration {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = cancel.cancelled() => {}
        }
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn print(
        &self,
        author: Option<&str>,
        text: &str,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        self.printed
            .lock()
            .unwrap()
            .push((author.map(str::to_owned), text.to_owned()));
        sleep_unless_cancelled(self.reveal_delay, cancel).await;
        Ok(())
    }

    async fn play_voice(
        &self,
        path: &str,
        _volume: f64,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        self.voices.lock().unwrap().push(path.to_owned());
        sleep_unless_cancelled(self.voice_duration, cancel).await;
        Ok(())
    }

    fn show_choices(&self, choices: &[ChoiceOption]) {
        self.shown_choices.lock().unwrap().push(choices.to_vec());
    }
}

/// A resource loader that records holds and releases.
#[derive(Debug, Default)]
pub struct RecordingResourceLoader {
    held: Mutex<Vec<(String, PlaybackSpot)>>,
    released: Mutex<Vec<(String, PlaybackSpot)>>,
}

impl RecordingResourceLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `hold` call in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn held(&self) -> Vec<(String, PlaybackSpot)> {
        self.held.lock().unwrap().clone()
    }

    /// Every `release` call in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn released(&self) -> Vec<(String, PlaybackSpot)> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceLoader for RecordingResourceLoader {
    async fn hold(&self, path: &str, holder: &PlaybackSpot) -> Result<(), EngineError> {
        self.held
            .lock()
            .unwrap()
            .push((path.to_owned(), holder.clone()));
        Ok(())
    }

    fn release(&self, path: &str, holder: &PlaybackSpot) {
        self.released
            .lock()
            .unwrap()
            .push((path.to_owned(), holder.clone()));
    }
}
