//! The command contract.
//!
//! Every executable unit of a playlist implements [`Command`]. Kinds declare
//! their scheduling traits up front so the player can decide, without
//! executing anything, whether to block on a command and whether its
//! resources can be held ahead of time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use narrator_core::cancel::CancelToken;
use narrator_core::error::EngineError;
use narrator_core::spot::PlaybackSpot;
use narrator_script::{NAMELESS, ParameterValue};
use serde::Serialize;

use crate::context::CommandContext;

/// Scheduling traits declared by a command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandTraits {
    /// The player blocks until the command completes.
    pub force_wait: bool,
    /// Resources can be held before execution.
    pub preloadable: bool,
    /// Text parameters take part in localization.
    pub localizable: bool,
}

impl CommandTraits {
    /// Blocking command without preload or localization.
    pub const FORCE_WAIT: Self = Self {
        force_wait: true,
        preloadable: false,
        localizable: false,
    };
}

/// Which services a reset leaves untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequest {
    /// Follow the player configuration.
    Default,
    /// Reset everything except the configured exclusions.
    All,
    /// Reset everything except these subsystem ids.
    Excluding(Vec<String>),
    /// Do not reset.
    Skip,
}

impl ResetRequest {
    /// Parses a `reset:` parameter: `*`, `-`, or a comma-separated list.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "*" => Self::All,
            "-" => Self::Skip,
            list => Self::Excluding(
                list.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
        }
    }
}

/// A jump to another script and/or label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Target script; `None` stays in the played script.
    pub script: Option<String>,
    /// Target label; `None` starts at the first line.
    pub label: Option<String>,
    /// Reset behaviour when leaving the played script.
    pub reset: ResetRequest,
}

impl NavigationRequest {
    /// Parses `Script.Label`, `.Label` or `Script`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an empty path.
    pub fn parse(path: &str, reset: ResetRequest) -> Result<Self, EngineError> {
        let path = path.trim();
        let (script, label) = match path.split_once('.') {
            Some((script, label)) => (script, Some(label)),
            None => (path, None),
        };
        let script = (!script.is_empty()).then(|| script.to_owned());
        let label = label.filter(|label| !label.is_empty()).map(str::to_owned);
        if script.is_none() && label.is_none() {
            return Err(EngineError::Validation(format!(
                "invalid navigation path `{path}`"
            )));
        }
        Ok(Self {
            script,
            label,
            reset,
        })
    }
}

/// What the player should do after a command completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Advance to the next command.
    Continue,
    /// Halt until a continue signal arrives.
    WaitForInput,
    /// Stop playback.
    Stop,
    /// Start playing elsewhere.
    Navigate(NavigationRequest),
    /// Reset services, keeping the given ids (or the configured default),
    /// then advance.
    Reset(Option<Vec<String>>),
}

/// Lifecycle of a command within one play invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Not dispatched yet.
    Pending,
    /// Dispatched and running.
    Executing,
    /// Finished, successfully or not.
    Complete,
    /// Aborted by cancellation.
    Canceled,
}

/// Atomic storage for an [`ExecutionState`].
#[derive(Debug)]
pub struct ExecutionCell(AtomicU8);

impl ExecutionCell {
    /// A cell in the `Pending` state.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> ExecutionState {
        match self.0.load(Ordering::Acquire) {
            1 => ExecutionState::Executing,
            2 => ExecutionState::Complete,
            3 => ExecutionState::Canceled,
            _ => ExecutionState::Pending,
        }
    }

    /// Replaces the state.
    pub fn set(&self, state: ExecutionState) {
        let raw = match state {
            ExecutionState::Pending => 0,
            ExecutionState::Executing => 1,
            ExecutionState::Complete => 2,
            ExecutionState::Canceled => 3,
        };
        self.0.store(raw, Ordering::Release);
    }
}

impl Default for ExecutionCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity and parameter bag shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBase {
    spot: PlaybackSpot,
    parameters: BTreeMap<String, ParameterValue>,
}

impl CommandBase {
    /// Creates a base from parsed parameters.
    #[must_use]
    pub fn new(spot: PlaybackSpot, parameters: BTreeMap<String, ParameterValue>) -> Self {
        Self { spot, parameters }
    }

    /// Where the command lives.
    #[must_use]
    pub fn spot(&self) -> &PlaybackSpot {
        &self.spot
    }

    /// All parameters keyed by lowercase name.
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, ParameterValue> {
        &self.parameters
    }

    /// Looks a parameter up by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(&name.to_ascii_lowercase())
    }

    /// The nameless parameter.
    #[must_use]
    pub fn nameless(&self) -> Option<&ParameterValue> {
        self.parameters.get(NAMELESS)
    }

    /// The nameless parameter, which the command cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when it is missing.
    pub fn required_nameless(&self) -> Result<&ParameterValue, EngineError> {
        self.nameless().ok_or_else(|| {
            EngineError::Validation(format!("command at {} is missing its value", self.spot))
        })
    }

    /// Reads a literal boolean parameter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the value is not `true` or
    /// `false`.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, EngineError> {
        match self.parameter(name) {
            None => Ok(default),
            Some(value) => match value.raw().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(EngineError::Validation(format!(
                    "parameter `{name}` at {} expects true or false, got `{other}`",
                    self.spot
                ))),
            },
        }
    }
}

/// An executable unit of a playlist.
#[async_trait]
pub trait Command: Send + Sync + fmt::Debug {
    /// Lowercase command name as registered.
    fn command_type(&self) -> &'static str;

    /// Identity and parameters.
    fn base(&self) -> &CommandBase;

    /// Scheduling traits of this kind.
    fn traits(&self) -> CommandTraits;

    /// Where the command lives.
    fn spot(&self) -> &PlaybackSpot {
        self.base().spot()
    }

    /// Runs the command. A cancelled command returns early with
    /// `Ok(CommandOutcome::Continue)`.
    async fn execute(
        &self,
        ctx: &CommandContext,
        cancel: &CancelToken,
    ) -> Result<CommandOutcome, EngineError>;

    /// Holds external resources ahead of execution.
    async fn hold_resources(&self, _ctx: &CommandContext) -> Result<(), EngineError> {
        Ok(())
    }

    /// Releases resources taken by [`Command::hold_resources`].
    fn release_resources(&self, _ctx: &CommandContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_paths() {
        let both = NavigationRequest::parse("Chapter2.Start", ResetRequest::Default).unwrap();
        let label = NavigationRequest::parse(".Start", ResetRequest::Default).unwrap();
        let script = NavigationRequest::parse("Chapter2", ResetRequest::Skip).unwrap();

        assert_eq!(both.script.as_deref(), Some("Chapter2"));
        assert_eq!(both.label.as_deref(), Some("Start"));
        assert_eq!(label.script, None);
        assert_eq!(label.label.as_deref(), Some("Start"));
        assert_eq!(script.label, None);
        assert_eq!(script.reset, ResetRequest::Skip);
        assert!(NavigationRequest::parse(".", ResetRequest::Default).is_err());
    }

    #[test]
    fn test_reset_request_forms() {
        assert_eq!(ResetRequest::parse("*"), ResetRequest::All);
        assert_eq!(ResetRequest::parse("-"), ResetRequest::Skip);
        assert_eq!(
            ResetRequest::parse("variables, backlog"),
            ResetRequest::Excluding(vec!["variables".to_owned(), "backlog".to_owned()])
        );
    }

    #[test]
    fn test_execution_cell_transitions() {
        let cell = ExecutionCell::new();
        assert_eq!(cell.get(), ExecutionState::Pending);

        cell.set(ExecutionState::Canceled);

        assert_eq!(cell.get(), ExecutionState::Canceled);
    }

    #[test]
    fn test_flag_parsing() {
        let mut parameters = BTreeMap::new();
        parameters.insert("waitinput".to_owned(), ParameterValue::new("TRUE"));
        parameters.insert("bad".to_owned(), ParameterValue::new("maybe"));
        let base = CommandBase::new(PlaybackSpot::new("s", 0, 0), parameters);

        assert!(base.flag("waitInput", false).unwrap());
        assert!(!base.flag("missing", false).unwrap());
        assert!(base.flag("bad", false).is_err());
        assert!(base.required_nameless().is_err());
    }
}
