//! Narrator Script — the line model.
//!
//! Raw script text is split into lines, each classified as a comment,
//! label, command, or generic text line. Lines are immutable once parsed;
//! an edited script is a new [`Script`] value.

pub mod line;
pub mod parse;
pub mod script;

pub use line::{LineContent, LineHash, LineKind, LineParseError, ScriptLine};
pub use parse::{CommandInvocation, GenericText, InlineSegment, NAMELESS, ParameterValue};
pub use script::Script;
