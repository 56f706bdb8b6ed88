//! One parsed script line.

use std::fmt;

use narrator_core::error::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::error;

use crate::parse::{CommandInvocation, GenericText, parse_command_body, parse_generic_text};

/// Content hash of a line's trimmed source text.
///
/// Two lines with identical trimmed text hash equal no matter which script
/// or position they come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineHash(String);

impl LineHash {
    /// Hashes the trimmed `raw_text`.
    #[must_use]
    pub fn of(raw_text: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(raw_text.trim().as_bytes())))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a line, decided from its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// `; text` or blank.
    Comment,
    /// `# Name`.
    Label,
    /// `@command ...`.
    Command,
    /// Anything else.
    GenericText,
}

impl LineKind {
    /// Classifies trimmed line text.
    #[must_use]
    pub fn classify(trimmed: &str) -> Self {
        match trimmed.chars().next() {
            None | Some(';') => Self::Comment,
            Some('#') => Self::Label,
            Some('@') => Self::Command,
            Some(_) => Self::GenericText,
        }
    }
}

/// Kind-specific payload of a successfully parsed line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineContent {
    /// Comment text without the marker.
    Comment(String),
    /// Label name.
    Label(String),
    /// A single command.
    Command(CommandInvocation),
    /// Printed text with optional inline commands.
    GenericText(GenericText),
}

/// A line that failed to parse. The line stays in the script, marked invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing `{script_name}` script at line #{line_number}: {message}")]
pub struct LineParseError {
    /// Script containing the line.
    pub script_name: String,
    /// One-based line number.
    pub line_number: usize,
    /// What went wrong.
    pub message: String,
}

impl From<LineParseError> for EngineError {
    fn from(err: LineParseError) -> Self {
        Self::LineParse {
            script_name: err.script_name,
            line_number: err.line_number,
            message: err.message,
        }
    }
}

/// An immutable parsed line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    script_name: String,
    line_index: usize,
    line_hash: LineHash,
    raw_text: String,
    kind: LineKind,
    content: Result<LineContent, LineParseError>,
}

impl ScriptLine {
    /// Classifies and parses `raw_text`. Failures are logged and kept on the
    /// line instead of being returned.
    #[must_use]
    pub fn parse(script_name: impl Into<String>, line_index: usize, raw_text: impl Into<String>) -> Self {
        let script_name = script_name.into();
        let raw_text = raw_text.into();
        let trimmed = raw_text.trim();
        let kind = LineKind::classify(trimmed);

        let content = parse_content(kind, trimmed).map_err(|message| LineParseError {
            script_name: script_name.clone(),
            line_number: line_index + 1,
            message,
        });
        if let Err(err) = &content {
            error!(
                script = %err.script_name,
                line_number = err.line_number,
                message = %err.message,
                "script line parse failed"
            );
        }

        Self {
            line_hash: LineHash::of(trimmed),
            script_name,
            line_index,
            raw_text,
            kind,
            content,
        }
    }

    /// Name of the owning script.
    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Zero-based position in the script.
    #[must_use]
    pub fn line_index(&self) -> usize {
        self.line_index
    }

    /// One-based line number for messages.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_index + 1
    }

    /// Hash of the trimmed source text.
    #[must_use]
    pub fn line_hash(&self) -> &LineHash {
        &self.line_hash
    }

    /// Source text as read.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Line classification.
    #[must_use]
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Parsed payload, or `None` when the line is invalid.
    #[must_use]
    pub fn content(&self) -> Option<&LineContent> {
        self.content.as_ref().ok()
    }

    /// The parse failure, if any.
    #[must_use]
    pub fn parse_error(&self) -> Option<&LineParseError> {
        self.content.as_ref().err()
    }

    /// Whether the line parsed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.content.is_ok()
    }

    /// Label name for label lines.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self.content() {
            Some(LineContent::Label(name)) => Some(name),
            _ => None,
        }
    }
}

fn parse_content(kind: LineKind, trimmed: &str) -> Result<LineContent, String> {
    match kind {
        LineKind::Comment => Ok(LineContent::Comment(
            trimmed.strip_prefix(';').unwrap_or(trimmed).trim().to_owned(),
        )),
        LineKind::Label => {
            let name = trimmed.trim_start_matches('#').trim();
            if name.is_empty() {
                Err("label name is missing".to_owned())
            } else if name.contains(char::is_whitespace) {
                Err(format!("label name `{name}` contains whitespace"))
            } else {
                Ok(LineContent::Label(name.to_owned()))
            }
        }
        LineKind::Command => {
            let body = trimmed.strip_prefix('@').unwrap_or(trimmed);
            parse_command_body(body).map(LineContent::Command)
        }
        LineKind::GenericText => parse_generic_text(trimmed).map(LineContent::GenericText),
    }
}
