//! Engine error types.

use thiserror::Error;

use crate::spot::PlaybackSpot;

/// Top-level engine error type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// A script line could not be parsed. Reported per line; never aborts a
    /// whole script parse.
    #[error("error parsing `{script_name}` script at line #{line_number}: {message}")]
    LineParse {
        /// Script containing the line.
        script_name: String,
        /// One-based line number.
        line_number: usize,
        /// What went wrong.
        message: String,
    },

    /// A navigation target label does not exist in the script.
    #[error("label `{label}` not found in `{script_name}` script")]
    LabelNotFound {
        /// Script that was searched.
        script_name: String,
        /// The missing label.
        label: String,
    },

    /// A script could not be located by the script provider.
    #[error("script not found: {0}")]
    ScriptNotFound(String),

    /// No retained snapshot matched the rollback predicate.
    #[error("rollback target not found in snapshot history")]
    RollbackTargetNotFound,

    /// A command failed while executing.
    #[error("command at {spot} failed: {message}")]
    CommandExecution {
        /// Where the failing command lives.
        spot: PlaybackSpot,
        /// What went wrong.
        message: String,
    },

    /// A save slot does not exist.
    #[error("save slot not found: {0}")]
    SlotNotFound(String),

    /// Invalid input or an operation not allowed in the current state.
    #[error("validation error: {0}")]
    Validation(String),

    /// State could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
