//! Pending choice options.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::presentation::ChoiceOption;
use narrator_core::subsystem::StatefulSubsystem;

/// Snapshot key of the choice state.
pub const CHOICES_ID: &str = "choices";

/// Options added by `@choice` that have not been picked yet.
#[derive(Debug, Default)]
pub struct ChoiceState {
    pending: Mutex<Vec<ChoiceOption>>,
}

impl ChoiceState {
    /// Creates an empty choice list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option and returns the full pending list.
    pub fn add(&self, option: ChoiceOption) -> Vec<ChoiceOption> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.push(option);
        pending.clone()
    }

    /// Copy of the pending options.
    #[must_use]
    pub fn pending(&self) -> Vec<ChoiceOption> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Picks an option, discarding every pending one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when `index` is out of range; the
    /// pending list is left untouched in that case.
    pub fn take(&self, index: usize) -> Result<ChoiceOption, EngineError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if index >= pending.len() {
            return Err(EngineError::Validation(format!(
                "choice {index} does not exist ({} pending)",
                pending.len()
            )));
        }
        let option = pending.swap_remove(index);
        pending.clear();
        Ok(option)
    }
}

#[async_trait]
impl StatefulSubsystem for ChoiceState {
    fn subsystem_id(&self) -> &str {
        CHOICES_ID
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.pending())?)
    }

    async fn load_state(&self, state: &str) -> Result<(), EngineError> {
        let options: Vec<ChoiceOption> = serde_json::from_str(state)?;
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = options;
        Ok(())
    }

    async fn reset_state(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use narrator_core::spot::PlaybackSpot;

    use super::*;

    fn option(summary: &str) -> ChoiceOption {
        ChoiceOption {
            summary: summary.to_owned(),
            goto: None,
            set_expression: None,
            button: None,
            spot: PlaybackSpot::new("s", 0, 0),
        }
    }

    #[test]
    fn test_take_returns_option_and_clears_the_rest() {
        let choices = ChoiceState::new();
        choices.add(option("Left"));
        choices.add(option("Right"));

        let picked = choices.take(1).unwrap();

        assert_eq!(picked.summary, "Right");
        assert!(choices.pending().is_empty());
    }

    #[test]
    fn test_take_out_of_range_keeps_pending() {
        let choices = ChoiceState::new();
        choices.add(option("Only"));

        assert!(choices.take(3).is_err());
        assert_eq!(choices.pending().len(), 1);
    }
}
