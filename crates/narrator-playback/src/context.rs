//! Collaborators handed to every command.

use std::fmt;
use std::sync::Arc;

use narrator_core::error::EngineError;
use narrator_core::presentation::{Presenter, ResourceLoader};
use narrator_core::subsystem::StatefulSubsystem;
use narrator_script::ParameterValue;

use crate::config::PlayerConfig;
use crate::pacing::Pacing;
use crate::services::{Backlog, ChoiceState, InputGate, VariableStore};

/// Everything a command may touch while executing. Built once by the host
/// and shared by the player and the state manager.
pub struct CommandContext {
    variables: Arc<VariableStore>,
    backlog: Arc<Backlog>,
    choices: Arc<ChoiceState>,
    input: Arc<InputGate>,
    pacing: Arc<Pacing>,
    presenter: Arc<dyn Presenter>,
    resources: Arc<dyn ResourceLoader>,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("variables", &self.variables)
            .field("mode", &self.pacing.mode())
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Creates a context with fresh services.
    #[must_use]
    pub fn new(
        presenter: Arc<dyn Presenter>,
        resources: Arc<dyn ResourceLoader>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            variables: Arc::new(VariableStore::new()),
            backlog: Arc::new(Backlog::new()),
            choices: Arc::new(ChoiceState::new()),
            input: Arc::new(InputGate::new()),
            pacing: Arc::new(Pacing::new(config)),
            presenter,
            resources,
        }
    }

    /// Custom variables.
    #[must_use]
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Printed message history.
    #[must_use]
    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    /// Pending choices.
    #[must_use]
    pub fn choices(&self) -> &ChoiceState {
        &self.choices
    }

    /// Input processing flag.
    #[must_use]
    pub fn input(&self) -> &InputGate {
        &self.input
    }

    /// Playback mode and delays.
    #[must_use]
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Output surface.
    #[must_use]
    pub fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    /// Resource holder used for preloading.
    #[must_use]
    pub fn resources(&self) -> &dyn ResourceLoader {
        self.resources.as_ref()
    }

    /// The built-in services that take part in snapshots, in restore order.
    #[must_use]
    pub fn subsystems(&self) -> Vec<Arc<dyn StatefulSubsystem>> {
        vec![
            self.variables.clone() as Arc<dyn StatefulSubsystem>,
            self.backlog.clone(),
            self.choices.clone(),
            self.input.clone(),
        ]
    }

    /// Resolves a parameter to its final text, substituting variables in
    /// dynamic values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when a referenced variable is
    /// unknown.
    pub fn resolve(&self, value: &ParameterValue) -> Result<String, EngineError> {
        match value {
            ParameterValue::Literal(raw) => Ok(raw.clone()),
            ParameterValue::Dynamic(raw) => self.variables.substitute(raw),
        }
    }
}
