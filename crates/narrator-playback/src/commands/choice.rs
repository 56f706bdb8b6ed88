//! Choice options.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_core::presentation::ChoiceOption;
use narrator_script::ParameterValue;

use crate::command::{Command, CommandBase, CommandOutcome, CommandTraits};
use crate::context::CommandContext;

/// `@choice "Summary" goto:.Label set:x=1 button:ui/Choice`
#[derive(Debug)]
pub struct AddChoiceCommand {
    base: CommandBase,
    summary: Option<ParameterValue>,
    goto: Option<ParameterValue>,
    set: Option<ParameterValue>,
    button: Option<ParameterValue>,
}

impl AddChoiceCommand {
    /// Registered name.
    pub const NAME: &'static str = "choice";

    /// Reads the optional parameters.
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible to match the factory signature.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        Ok(Self {
            summary: base.nameless().cloned(),
            goto: base.parameter("goto").cloned(),
            set: base.parameter("set").cloned(),
            button: base.parameter("button").cloned(),
            base,
        })
    }

    fn literal_button(&self) -> Option<&str> {
        self.button
            .as_ref()
            .filter(|button| !button.is_dynamic())
            .map(ParameterValue::raw)
    }
}

#[async_trait]
impl Command for AddChoiceCommand {
    fn command_type(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn traits(&self) -> CommandTraits {
        CommandTraits {
            force_wait: true,
            preloadable: true,
            localizable: true,
        }
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        _cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let resolve = |value: &Option<ParameterValue>| {
            value.as_ref().map(|value| ctx.resolve(value)).transpose()
        };
        let option = ChoiceOption {
            summary: resolve(&self.summary)?.unwrap_or_default(),
            goto: resolve(&self.goto)?,
            // Assignments are evaluated when picked, not when offered.
            set_expression: self.set.as_ref().map(|set| set.raw().to_owned()),
            button: resolve(&self.button)?,
            spot: self.spot().clone(),
        };
        let pending = ctx.choices().add(option);
        ctx.presenter().show_choices(&pending);
        Ok(CommandOutcome::Continue)
    }

    async fn hold_resources(&self, ctx: &CommandContext) -> Result<(), EngineError> {
        if let Some(button) = self.literal_button() {
            ctx.resources().hold(button, self.spot()).await?;
        }
        Ok(())
    }

    fn release_resources(&self, ctx: &CommandContext) {
        if let Some(button) = self.literal_button() {
            ctx.resources().release(button, self.spot());
        }
    }
}
