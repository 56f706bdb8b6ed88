//! Command kinds by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use narrator_core::error::EngineError;
use narrator_core::spot::PlaybackSpot;
use narrator_script::CommandInvocation;

use crate::command::{Command, CommandBase};
use crate::commands::{
    AddChoiceCommand, ClearBacklogCommand, GotoCommand, PlayVoiceCommand, PrintCommand,
    ProcessInputCommand, ResetStateCommand, SetCommand, StopCommand, WaitCommand,
};

/// Builds a command from its parsed parameters.
pub type CommandFactory =
    Arc<dyn Fn(CommandBase) -> Result<Arc<dyn Command>, EngineError> + Send + Sync>;

/// Case-insensitive map from command name to factory.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    factories: HashMap<String, CommandFactory>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}

fn factory<C, F>(build: F) -> CommandFactory
where
    C: Command + 'static,
    F: Fn(CommandBase) -> Result<C, EngineError> + Send + Sync + 'static,
{
    Arc::new(move |base| Ok(Arc::new(build(base)?) as Arc<dyn Command>))
}

impl CommandRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in kind.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(PrintCommand::NAME, factory(PrintCommand::new));
        registry.register(WaitCommand::NAME, factory(WaitCommand::new));
        registry.register(GotoCommand::NAME, factory(GotoCommand::new));
        registry.register(StopCommand::NAME, factory(StopCommand::new));
        registry.register(SetCommand::NAME, factory(SetCommand::new));
        registry.register(ResetStateCommand::NAME, factory(ResetStateCommand::new));
        registry.register(ProcessInputCommand::NAME, factory(ProcessInputCommand::new));
        registry.register(ClearBacklogCommand::NAME, factory(ClearBacklogCommand::new));
        registry.register(AddChoiceCommand::NAME, factory(AddChoiceCommand::new));
        registry.register(PlayVoiceCommand::NAME, factory(PlayVoiceCommand::new));
        registry
    }

    /// Adds or replaces a command kind.
    pub fn register(&mut self, name: &str, factory: CommandFactory) {
        self.factories.insert(name.to_ascii_lowercase(), factory);
    }

    /// Whether a kind with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Instantiates the command for `invocation` at `spot`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an unknown name or invalid
    /// parameters.
    pub fn create(
        &self,
        invocation: &CommandInvocation,
        spot: PlaybackSpot,
    ) -> Result<Arc<dyn Command>, EngineError> {
        let factory = self
            .factories
            .get(&invocation.name.to_ascii_lowercase())
            .ok_or_else(|| {
                EngineError::Validation(format!("unknown command `{}`", invocation.name))
            })?;
        factory(CommandBase::new(spot, invocation.parameters.clone()))
    }
}
