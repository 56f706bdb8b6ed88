//! Parsing of command bodies and generic text lines.

use std::collections::BTreeMap;

/// Key under which the nameless parameter is stored.
pub const NAMELESS: &str = "";

/// A raw parameter value as written in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Known at parse time.
    Literal(String),
    /// Contains `{variable}` references resolved at execution time.
    Dynamic(String),
}

impl ParameterValue {
    /// Classifies `raw` as literal or dynamic.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if is_dynamic(&raw) {
            Self::Dynamic(raw)
        } else {
            Self::Literal(raw)
        }
    }

    /// The value as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Literal(raw) | Self::Dynamic(raw) => raw,
        }
    }

    /// Whether the value depends on variables.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

fn is_dynamic(raw: &str) -> bool {
    raw.find('{')
        .is_some_and(|open| raw[open..].contains('}'))
}

/// A command name with its parameter bag. Parameter names are stored
/// lowercase; the nameless parameter lives under [`NAMELESS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Command name as written.
    pub name: String,
    /// Parameters keyed by lowercase name.
    pub parameters: BTreeMap<String, ParameterValue>,
}

impl CommandInvocation {
    /// Creates an invocation without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Adds a parameter, classifying its value.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters
            .insert(name.to_ascii_lowercase(), ParameterValue::new(value));
        self
    }

    /// Looks a parameter up by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(&name.to_ascii_lowercase())
    }

    /// The nameless parameter, if present.
    #[must_use]
    pub fn nameless(&self) -> Option<&ParameterValue> {
        self.parameters.get(NAMELESS)
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One piece of a generic text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSegment {
    /// Text to print.
    Text(String),
    /// An inline `[command]`.
    Command(CommandInvocation),
}

/// Payload of a generic text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericText {
    /// Author prefix (`Kohaku: ...`), if any.
    pub author: Option<String>,
    /// Text and inline commands in source order.
    pub segments: Vec<InlineSegment>,
}

/// Parses `name nameless key:value key:"quoted value"`.
///
/// # Errors
///
/// Returns a message describing the first syntax problem found.
pub fn parse_command_body(body: &str) -> Result<CommandInvocation, String> {
    let body = body.trim();
    let (name, rest) = match body.find(char::is_whitespace) {
        Some(position) => (&body[..position], &body[position..]),
        None => (body, ""),
    };
    if name.is_empty() {
        return Err("missing command name".to_owned());
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format!("invalid command name `{name}`"));
    }

    let mut invocation = CommandInvocation::new(name);
    for token in tokenize(rest)? {
        let key = match token.key {
            Some(key) if key.is_empty() => return Err("empty parameter name".to_owned()),
            Some(key) => key.to_ascii_lowercase(),
            None => NAMELESS.to_owned(),
        };
        if invocation.parameters.contains_key(&key) {
            return Err(if key.is_empty() {
                "more than one nameless parameter".to_owned()
            } else {
                format!("duplicate parameter `{key}`")
            });
        }
        invocation
            .parameters
            .insert(key, ParameterValue::new(token.value));
    }
    Ok(invocation)
}

struct Token {
    key: Option<String>,
    value: String,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut key: Option<String> = None;
    let mut in_quotes = false;
    let mut started = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(chars.next().unwrap_or('\\'));
                started = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            ':' if !in_quotes && key.is_none() => {
                key = Some(std::mem::take(&mut current));
                started = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    tokens.push(Token {
                        key: key.take(),
                        value: std::mem::take(&mut current),
                    });
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_owned());
    }
    if started {
        tokens.push(Token {
            key,
            value: current,
        });
    }
    Ok(tokens)
}

/// Parses a generic text line into its author and segments.
///
/// # Errors
///
/// Returns a message when an inline command is unclosed or malformed.
pub fn parse_generic_text(text: &str) -> Result<GenericText, String> {
    let (author, body) = split_author(text);
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '[' | ']'))) => {
                if let Some((_, escaped)) = chars.next() {
                    buffer.push(escaped);
                }
            }
            '[' => {
                let start = index + 1;
                let close = find_inline_close(&body[start..])
                    .ok_or_else(|| "unclosed inline command".to_owned())?;
                let end = start + close;
                let invocation = parse_command_body(&body[start..end])?;
                flush_text(&mut buffer, &mut segments);
                segments.push(InlineSegment::Command(invocation));
                while chars.next_if(|(position, _)| *position <= end).is_some() {}
            }
            c => buffer.push(c),
        }
    }
    flush_text(&mut buffer, &mut segments);

    Ok(GenericText { author, segments })
}

fn split_author(text: &str) -> (Option<String>, &str) {
    if let Some((prefix, body)) = text.split_once(": ") {
        let valid = !prefix.is_empty()
            && !prefix.contains(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '"' | '\\'));
        if valid {
            return (Some(prefix.to_owned()), body);
        }
    }
    (None, text)
}

fn find_inline_close(rest: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => return Some(index),
            _ => {}
        }
    }
    None
}

fn flush_text(buffer: &mut String, segments: &mut Vec<InlineSegment>) {
    if buffer.trim().is_empty() {
        buffer.clear();
    } else {
        segments.push(InlineSegment::Text(std::mem::take(buffer)));
    }
}
