//! Playback coordinates.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Addresses one command instance inside a script.
///
/// Spots are totally ordered by `(line_index, inline_index)` within a single
/// script. Spots from different scripts are incomparable, so `partial_cmp`
/// returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSpot {
    /// Name of the script the command belongs to.
    pub script_name: String,
    /// Zero-based index of the source line.
    pub line_index: usize,
    /// Zero-based position of the command inside its line.
    pub inline_index: usize,
}

impl PlaybackSpot {
    /// Creates a new spot.
    #[must_use]
    pub fn new(script_name: impl Into<String>, line_index: usize, inline_index: usize) -> Self {
        Self {
            script_name: script_name.into(),
            line_index,
            inline_index,
        }
    }

    /// One-based line number, as shown to script authors.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_index + 1
    }

    /// Returns the `(line_index, inline_index)` pair used for ordering.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.line_index, self.inline_index)
    }
}

impl PartialOrd for PlaybackSpot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.script_name != other.script_name {
            return None;
        }
        Some(self.position().cmp(&other.position()))
    }
}

impl fmt::Display for PlaybackSpot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}.{}",
            self.script_name,
            self.line_number(),
            self.inline_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spots_order_by_line_then_inline_index() {
        let a = PlaybackSpot::new("Demo", 1, 3);
        let b = PlaybackSpot::new("Demo", 2, 0);
        let c = PlaybackSpot::new("Demo", 2, 1);

        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.partial_cmp(&b.clone()), Some(Ordering::Equal));
    }

    #[test]
    fn test_spots_from_different_scripts_are_incomparable() {
        let a = PlaybackSpot::new("Demo", 1, 0);
        let b = PlaybackSpot::new("Other", 1, 0);

        assert_eq!(a.partial_cmp(&b), None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_uses_one_based_line_number() {
        let spot = PlaybackSpot::new("Demo", 4, 2);
        assert_eq!(spot.to_string(), "Demo#5.2");
    }
}
