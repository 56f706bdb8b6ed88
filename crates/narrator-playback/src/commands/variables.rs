//! Variable assignment.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_script::ParameterValue;

use crate::command::{Command, CommandBase, CommandOutcome, CommandTraits};
use crate::context::CommandContext;

/// `@set score=score+1;seen=true`
#[derive(Debug)]
pub struct SetCommand {
    base: CommandBase,
    expression: ParameterValue,
}

impl SetCommand {
    /// Registered name.
    pub const NAME: &'static str = "set";

    /// Requires the expression.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the expression is missing.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        Ok(Self {
            expression: base.required_nameless()?.clone(),
            base,
        })
    }
}

#[async_trait]
impl Command for SetCommand {
    fn command_type(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn traits(&self) -> CommandTraits {
        CommandTraits::FORCE_WAIT
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        _cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let expression = ctx.resolve(&self.expression)?;
        ctx.variables().apply(&expression)?;
        Ok(CommandOutcome::Continue)
    }
}
