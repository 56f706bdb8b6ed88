//! Text output commands.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_script::ParameterValue;

use crate::command::{Command, CommandBase, CommandOutcome, CommandTraits};
use crate::context::CommandContext;
use crate::services::BacklogMessage;

/// `@print text author:Name waitInput:true`. Generic text lines build these.
#[derive(Debug)]
pub struct PrintCommand {
    base: CommandBase,
    text: ParameterValue,
    author: Option<ParameterValue>,
    wait_input: bool,
}

impl PrintCommand {
    /// Registered name.
    pub const NAME: &'static str = "print";

    /// Validates parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the text is missing or
    /// `waitInput` is not a boolean.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        Ok(Self {
            text: base.required_nameless()?.clone(),
            author: base.parameter("author").cloned(),
            wait_input: base.flag("waitInput", false)?,
            base,
        })
    }

    /// Whether playback waits for input after printing.
    #[must_use]
    pub fn waits_for_input(&self) -> bool {
        self.wait_input
    }
}

#[async_trait]
impl Command for PrintCommand {
    fn command_type(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn traits(&self) -> CommandTraits {
        CommandTraits {
            force_wait: true,
            preloadable: false,
            localizable: true,
        }
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let text = ctx.resolve(&self.text)?;
        let author = self
            .author
            .as_ref()
            .map(|author| ctx.resolve(author))
            .transpose()?;

        ctx.presenter().print(author.as_deref(), &text, cancel).await?;
        if cancel.is_cancelled() {
            return Ok(CommandOutcome::Continue);
        }

        ctx.backlog().push(BacklogMessage {
            author,
            text,
            spot: self.spot().clone(),
        });
        Ok(if self.wait_input {
            CommandOutcome::WaitForInput
        } else {
            CommandOutcome::Continue
        })
    }
}

/// `@clearBacklog`
#[derive(Debug)]
pub struct ClearBacklogCommand {
    base: CommandBase,
}

impl ClearBacklogCommand {
    /// Registered name.
    pub const NAME: &'static str = "clearbacklog";

    /// Takes no parameters.
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible to match the factory signature.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        Ok(Self { base })
    }
}

#[async_trait]
impl Command for ClearBacklogCommand {
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
        ctx.backlog().clear();
        Ok(CommandOutcome::Continue)
    }
}
