//! Voice playback.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_script::ParameterValue;

use crate::command::{Command, CommandBase, CommandOutcome, CommandTraits};
use crate::context::CommandContext;

/// `@voice path volume:0.8`. Plays alongside the following commands.
#[derive(Debug)]
pub struct PlayVoiceCommand {
    base: CommandBase,
    path: ParameterValue,
    volume: f64,
}

impl PlayVoiceCommand {
    /// Registered name.
    pub const NAME: &'static str = "voice";

    /// Validates the clip path and volume.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the path is missing or the
    /// volume is not a number in `0..=1`.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        let path = base.required_nameless()?.clone();
        let volume = match base.parameter("volume") {
            None => 1.0,
            Some(value) => match value.raw().parse::<f64>() {
                Ok(volume) if (0.0..=1.0).contains(&volume) => volume,
                _ => {
                    return Err(EngineError::Validation(format!(
                        "voice volume must be between 0 and 1, got `{}`",
                        value.raw()
                    )));
                }
            },
        };
        Ok(Self { base, path, volume })
    }

    fn literal_path(&self) -> Option<&str> {
        (!self.path.is_dynamic()).then(|| self.path.raw())
    }
}

#[async_trait]
impl Command for PlayVoiceCommand {
    fn command_type(&self) -> &'static str {
        Self::NAME
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn traits(&self) -> CommandTraits {
        CommandTraits {
            force_wait: false,
            preloadable: true,
            localizable: false,
        }
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let path = ctx.resolve(&self.path)?;
        ctx.presenter().play_voice(&path, self.volume, cancel).await?;
        Ok(CommandOutcome::Continue)
    }

    async fn hold_resources(&self, ctx: &CommandContext) -> Result<(), EngineError> {
        if let Some(path) = self.literal_path() {
            ctx.resources().hold(path, self.spot()).await?;
        }
        Ok(())
    }

    fn release_resources(&self, ctx: &CommandContext) {
        if let Some(path) = self.literal_path() {
            ctx.resources().release(path, self.spot());
        }
    }
}
