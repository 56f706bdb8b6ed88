//! Flow control commands.

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_script::ParameterValue;

use crate::command::{
    Command, CommandBase, CommandOutcome, CommandTraits, NavigationRequest, ResetRequest,
};
use crate::context::CommandContext;

#[derive(Debug, Clone, PartialEq)]
enum WaitKind {
    Input,
    Seconds(f64),
    Dynamic(ParameterValue),
}

fn parse_wait(raw: &str) -> Result<WaitKind, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("i") {
        return Ok(WaitKind::Input);
    }
    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(WaitKind::Seconds(secs)),
        _ => Err(format!("`{raw}` is neither `i` nor a number of seconds")),
    }
}

/// `@wait i` waits for input; `@wait 1.5` waits for a delay.
#[derive(Debug)]
pub struct WaitCommand {
    base: CommandBase,
    kind: WaitKind,
}

impl WaitCommand {
    /// Registered name.
    pub const NAME: &'static str = "wait";

    /// Validates the wait value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for a missing or malformed value.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        let value = base.required_nameless()?;
        let kind = if value.is_dynamic() {
            WaitKind::Dynamic(value.clone())
        } else {
            parse_wait(value.raw()).map_err(EngineError::Validation)?
        };
        Ok(Self { base, kind })
    }
}

#[async_trait]
impl Command for WaitCommand {
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
        cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let kind = match &self.kind {
            WaitKind::Dynamic(value) => {
                parse_wait(&ctx.resolve(value)?).map_err(EngineError::Validation)?
            }
            other => other.clone(),
        };
        match kind {
            WaitKind::Input => Ok(CommandOutcome::WaitForInput),
            WaitKind::Seconds(secs) => {
                ctx.pacing().delay(secs, cancel).await;
                Ok(CommandOutcome::Continue)
            }
            WaitKind::Dynamic(_) => Err(EngineError::Validation(
                "wait value resolved to another reference".to_owned(),
            )),
        }
    }
}

/// `@goto Script.Label reset:*`
#[derive(Debug)]
pub struct GotoCommand {
    base: CommandBase,
    path: ParameterValue,
    reset: ResetRequest,
}

impl GotoCommand {
    /// Registered name.
    pub const NAME: &'static str = "goto";

    /// Validates the target path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the path is missing or
    /// malformed.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        let path = base.required_nameless()?.clone();
        let reset = base
            .parameter("reset")
            .map_or(ResetRequest::Default, |value| ResetRequest::parse(value.raw()));
        if !path.is_dynamic() {
            NavigationRequest::parse(path.raw(), reset.clone())?;
        }
        Ok(Self { base, path, reset })
    }
}

#[async_trait]
impl Command for GotoCommand {
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
        let path = ctx.resolve(&self.path)?;
        Ok(CommandOutcome::Navigate(NavigationRequest::parse(
            &path,
            self.reset.clone(),
        )?))
    }
}

/// `@stop`
#[derive(Debug)]
pub struct StopCommand {
    base: CommandBase,
}

impl StopCommand {
    /// Registered name.
    pub const NAME: &'static str = "stop";

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
impl Command for StopCommand {
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
        _ctx: &CommandContext,
        _cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        Ok(CommandOutcome::Stop)
    }
}

/// `@resetState` or `@resetState variables,backlog`
#[derive(Debug)]
pub struct ResetStateCommand {
    base: CommandBase,
    excluded: Option<Vec<String>>,
}

impl ResetStateCommand {
    /// Registered name.
    pub const NAME: &'static str = "resetstate";

    /// Reads the optional exclusion list.
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible to match the factory signature.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        let excluded = base.nameless().map(|value| {
            value
                .raw()
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect()
        });
        Ok(Self { base, excluded })
    }
}

#[async_trait]
impl Command for ResetStateCommand {
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
        _ctx: &CommandContext,
        _cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        Ok(CommandOutcome::Reset(self.excluded.clone()))
    }
}

/// `@processInput false`
#[derive(Debug)]
pub struct ProcessInputCommand {
    base: CommandBase,
    enabled: bool,
}

impl ProcessInputCommand {
    /// Registered name.
    pub const NAME: &'static str = "processinput";

    /// Reads the boolean flag.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the value is missing or not
    /// a boolean.
    pub fn new(base: CommandBase) -> Result<Self, EngineError> {
        let raw = base.required_nameless()?.raw().to_ascii_lowercase();
        let enabled = match raw.as_str() {
            "true" => true,
            "false" => false,
            other => {
                return Err(EngineError::Validation(format!(
                    "processInput expects true or false, got `{other}`"
                )));
            }
        };
        Ok(Self { base, enabled })
    }
}

#[async_trait]
impl Command for ProcessInputCommand {
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
        ctx.input().set_enabled(self.enabled);
        Ok(CommandOutcome::Continue)
    }
}
