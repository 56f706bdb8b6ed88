//! A parsed script with its label index.

use std::collections::HashMap;

use narrator_core::error::EngineError;
use tracing::warn;

use crate::line::{LineHash, LineParseError, ScriptLine};

/// An ordered, named collection of lines. Editing a script means parsing a
/// new `Script`; instances are never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    name: String,
    lines: Vec<ScriptLine>,
    labels: HashMap<String, usize>,
}

impl Script {
    /// Parses every line of `source` once, in order.
    #[must_use]
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        let name = name.into();
        let lines = source
            .lines()
            .enumerate()
            .map(|(index, text)| ScriptLine::parse(name.clone(), index, text))
            .collect();
        Self::from_lines(name, lines)
    }

    /// Builds a script from already parsed lines. Line indices must equal
    /// their positions.
    #[must_use]
    pub fn from_lines(name: impl Into<String>, lines: Vec<ScriptLine>) -> Self {
        let name = name.into();
        let mut labels = HashMap::new();
        for line in &lines {
            if let Some(label) = line.label() {
                if labels.contains_key(label) {
                    warn!(script = %name, label, line_number = line.line_number(), "duplicate label ignored");
                } else {
                    labels.insert(label.to_owned(), line.line_index());
                }
            }
        }
        Self {
            name,
            lines,
            labels,
        }
    }

    /// Script name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All lines in order.
    #[must_use]
    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    /// Line at `index`, if in range.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&ScriptLine> {
        self.lines.get(index)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the script has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether `index` addresses an existing line.
    #[must_use]
    pub fn is_index_valid(&self, index: usize) -> bool {
        index < self.lines.len()
    }

    /// Whether a label with this name exists.
    #[must_use]
    pub fn label_exists(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Line index of `label`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LabelNotFound`] when the label is absent.
    pub fn line_index_for_label(&self, label: &str) -> Result<usize, EngineError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| EngineError::LabelNotFound {
                script_name: self.name.clone(),
                label: label.to_owned(),
            })
    }

    /// Hash of every line, by index.
    #[must_use]
    pub fn line_hashes(&self) -> Vec<LineHash> {
        self.lines.iter().map(|line| line.line_hash().clone()).collect()
    }

    /// Parse failures in line order.
    pub fn parse_errors(&self) -> impl Iterator<Item = &LineParseError> {
        self.lines.iter().filter_map(ScriptLine::parse_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineKind;

    const DEMO: &str = "# Start\nHello\n@wait 1\nWorld";

    #[test]
    fn test_parse_keeps_contiguous_indices_and_labels() {
        // Act
        let script = Script::parse("Demo", DEMO);

        // Assert
        assert_eq!(script.name(), "Demo");
        assert_eq!(script.len(), 4);
        for (position, line) in script.lines().iter().enumerate() {
            assert_eq!(line.line_index(), position);
            assert_eq!(line.script_name(), "Demo");
        }
        assert!(script.label_exists("Start"));
        assert_eq!(script.line_index_for_label("Start").unwrap(), 0);
        assert_eq!(script.line(2).unwrap().kind(), LineKind::Command);
    }

    #[test]
    fn test_missing_label_is_reported() {
        let script = Script::parse("Demo", DEMO);

        let err = script.line_index_for_label("Nowhere").unwrap_err();

        assert_eq!(
            err,
            EngineError::LabelNotFound {
                script_name: "Demo".to_owned(),
                label: "Nowhere".to_owned(),
            }
        );
    }

    #[test]
    fn test_bad_line_does_not_shift_siblings() {
        // Arrange
        let source = "Before\n@print \"oops\n# After";

        // Act
        let script = Script::parse("Broken", source);

        // Assert
        assert_eq!(script.len(), 3);
        assert!(script.line(0).unwrap().is_valid());
        assert!(!script.line(1).unwrap().is_valid());
        assert_eq!(script.line_index_for_label("After").unwrap(), 2);
        assert_eq!(script.parse_errors().count(), 1);
    }

    #[test]
    fn test_duplicate_label_keeps_first_occurrence() {
        let script = Script::parse("Dup", "# A\nText\n# A");

        assert_eq!(script.line_index_for_label("A").unwrap(), 0);
    }

    #[test]
    fn test_index_validity() {
        let script = Script::parse("Demo", DEMO);

        assert!(script.is_index_valid(3));
        assert!(!script.is_index_valid(4));
    }
}
