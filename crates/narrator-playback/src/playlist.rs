//! Flattening a script into playable commands.

use std::sync::Arc;

use narrator_core::spot::PlaybackSpot;
use narrator_script::{CommandInvocation, InlineSegment, LineContent, Script};
use tracing::{error, warn};

use crate::command::{Command, ExecutionCell, ExecutionState};
use crate::commands::PrintCommand;
use crate::registry::CommandRegistry;

/// Inline pseudo-command that keeps a text line from waiting for input.
pub const SKIP_INPUT: &str = "skipInput";

/// A command together with its execution state in the current play.
#[derive(Debug)]
pub struct PlaylistEntry {
    command: Arc<dyn Command>,
    state: ExecutionCell,
}

impl PlaylistEntry {
    /// The command.
    #[must_use]
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// Where the command lives.
    #[must_use]
    pub fn spot(&self) -> &PlaybackSpot {
        self.command.spot()
    }

    /// Execution state within the current play.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: ExecutionState) {
        self.state.set(state);
    }
}

/// Ordered commands of one script, sorted by playback spot.
#[derive(Debug)]
pub struct Playlist {
    script: Arc<Script>,
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Builds the playlist for `script`. Pure: nothing outside the returned
    /// value is touched, so it is safe to build speculatively.
    #[must_use]
    pub fn build(script: Arc<Script>, registry: &CommandRegistry) -> Self {
        let mut entries = Vec::new();
        for line in script.lines() {
            let Some(content) = line.content() else {
                continue;
            };
            let invocations = match content {
                LineContent::Comment(_) | LineContent::Label(_) => continue,
                LineContent::Command(invocation) => vec![invocation.clone()],
                LineContent::GenericText(text) => expand_generic_text(text),
            };
            for (inline_index, invocation) in invocations.into_iter().enumerate() {
                let spot = PlaybackSpot::new(script.name(), line.line_index(), inline_index);
                match registry.create(&invocation, spot.clone()) {
                    Ok(command) => entries.push(PlaylistEntry {
                        command,
                        state: ExecutionCell::new(),
                    }),
                    Err(err) => error!(spot = %spot, error = %err, "command skipped"),
                }
            }
        }
        Self { script, entries }
    }

    /// The script this playlist was built from.
    #[must_use]
    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    /// Every entry in order.
    #[must_use]
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Playback spots in order.
    #[must_use]
    pub fn spots(&self) -> Vec<PlaybackSpot> {
        self.entries.iter().map(|entry| entry.spot().clone()).collect()
    }

    /// Index of the last command whose spot is at or before
    /// `(line_index, inline_index)`.
    #[must_use]
    pub fn index_before_line(&self, line_index: usize, inline_index: usize) -> Option<usize> {
        let target = (line_index, inline_index);
        let after = self
            .entries
            .partition_point(|entry| entry.spot().position() <= target);
        after.checked_sub(1)
    }

    /// The last command whose spot is at or before
    /// `(line_index, inline_index)`, or `None` when the target precedes the
    /// first command.
    #[must_use]
    pub fn command_before_line(
        &self,
        line_index: usize,
        inline_index: usize,
    ) -> Option<&Arc<dyn Command>> {
        self.index_before_line(line_index, inline_index)
            .map(|index| &self.entries[index].command)
    }

    /// Index of the command at exactly `spot`.
    #[must_use]
    pub fn index_of_spot(&self, spot: &PlaybackSpot) -> Option<usize> {
        if spot.script_name != self.script.name() {
            return None;
        }
        self.entries
            .binary_search_by(|entry| entry.spot().position().cmp(&spot.position()))
            .ok()
    }

    /// Index of the first command on or after `line_index`; equals
    /// [`Playlist::len`] when no such command exists.
    #[must_use]
    pub fn index_at_or_after_line(&self, line_index: usize) -> usize {
        self.entries
            .partition_point(|entry| entry.spot().line_index < line_index)
    }

    /// Marks every entry pending again.
    pub(crate) fn reset_states(&self) {
        for entry in &self.entries {
            entry.set_state(ExecutionState::Pending);
        }
    }
}

fn expand_generic_text(text: &narrator_script::GenericText) -> Vec<CommandInvocation> {
    let skip_input = text.segments.iter().any(
        |segment| matches!(segment, InlineSegment::Command(invocation) if invocation.is(SKIP_INPUT)),
    );

    let mut invocations: Vec<CommandInvocation> = text
        .segments
        .iter()
        .filter_map(|segment| match segment {
            InlineSegment::Command(invocation) if invocation.is(SKIP_INPUT) => None,
            InlineSegment::Command(invocation) => Some(invocation.clone()),
            InlineSegment::Text(body) => {
                let mut print = CommandInvocation::new(PrintCommand::NAME).with_parameter("", body);
                if let Some(author) = &text.author {
                    print = print.with_parameter("author", author);
                }
                Some(print)
            }
        })
        .collect();

    if !skip_input {
        match invocations
            .iter_mut()
            .rev()
            .find(|invocation| invocation.is(PrintCommand::NAME))
        {
            Some(last_print) => {
                *last_print = last_print.clone().with_parameter("waitInput", "true");
            }
            None => warn!("text line without printable text"),
        }
    }
    invocations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Arc<Script> {
        Arc::new(Script::parse("Demo", "# Start\nHello\n@wait 1\nWorld"))
    }

    #[test]
    fn test_demo_playlist_has_one_command_per_playable_line() {
        // Act
        let playlist = Playlist::build(demo(), &CommandRegistry::with_builtins());

        // Assert
        assert_eq!(
            playlist.spots(),
            vec![
                PlaybackSpot::new("Demo", 1, 0),
                PlaybackSpot::new("Demo", 2, 0),
                PlaybackSpot::new("Demo", 3, 0),
            ]
        );
        assert_eq!(playlist.get(0).unwrap().command().command_type(), "print");
        assert_eq!(playlist.get(1).unwrap().command().command_type(), "wait");
    }

    #[test]
    fn test_command_before_line() {
        let playlist = Playlist::build(demo(), &CommandRegistry::with_builtins());

        let command = playlist.command_before_line(2, 0).unwrap();

        assert_eq!(command.spot().line_index, 2);
        assert_eq!(playlist.command_before_line(1, 5).unwrap().spot().line_index, 1);
        assert!(playlist.command_before_line(0, 0).is_none());
        assert_eq!(playlist.command_before_line(99, 0).unwrap().spot().line_index, 3);
    }

    #[test]
    fn test_command_strictly_before_line_queries_previous_line() {
        // Arrange
        let playlist = Playlist::build(demo(), &CommandRegistry::with_builtins());

        // Act
        let at_or_before = playlist.command_before_line(2, 0).unwrap();
        let strictly_before = playlist.command_before_line(2 - 1, usize::MAX).unwrap();

        // Assert
        assert_eq!(at_or_before.spot().line_index, 2);
        assert_eq!(strictly_before.spot().line_index, 1);
        assert_eq!(strictly_before.command_type(), "print");
    }

    #[test]
    fn test_building_twice_yields_identical_spots() {
        let script = Arc::new(Script::parse(
            "Det",
            "; intro\nA: One[wait 0.1] two\n@set x=1\n# Mid\n@unknown\nThree[skipInput]\n@stop",
        ));
        let registry = CommandRegistry::with_builtins();

        let first = Playlist::build(script.clone(), &registry);
        let second = Playlist::build(script, &registry);

        assert_eq!(first.spots(), second.spots());
    }

    #[test]
    fn test_generic_text_expands_inline_commands_in_order() {
        // Arrange
        let script = Arc::new(Script::parse("Inline", "Kohaku: One[wait 0.5] two"));

        // Act
        let playlist = Playlist::build(script, &CommandRegistry::with_builtins());

        // Assert
        let spots = playlist.spots();
        assert_eq!(spots.len(), 3);
        assert_eq!(spots[0].position(), (0, 0));
        assert_eq!(spots[1].position(), (0, 1));
        assert_eq!(spots[2].position(), (0, 2));
        let types: Vec<&str> = playlist
            .entries()
            .iter()
            .map(|entry| entry.command().command_type())
            .collect();
        assert_eq!(types, vec!["print", "wait", "print"]);
        let last = playlist.get(2).unwrap().command();
        assert_eq!(last.base().parameter("waitInput").unwrap().raw(), "true");
        assert_eq!(last.base().parameter("author").unwrap().raw(), "Kohaku");
        assert!(
            playlist
                .get(0)
                .unwrap()
                .command()
                .base()
                .parameter("waitInput")
                .is_none()
        );
    }

    #[test]
    fn test_skip_input_suppresses_wait() {
        let script = Arc::new(Script::parse("Skip", "Quick line[skipInput]"));

        let playlist = Playlist::build(script, &CommandRegistry::with_builtins());

        assert_eq!(playlist.len(), 1);
        assert!(
            playlist
                .get(0)
                .unwrap()
                .command()
                .base()
                .parameter("waitInput")
                .is_none()
        );
    }

    #[test]
    fn test_invalid_and_unknown_lines_are_skipped() {
        let script = Arc::new(Script::parse("Bad", "@print \"open\n@fly high\n@stop"));

        let playlist = Playlist::build(script, &CommandRegistry::with_builtins());

        assert_eq!(playlist.spots(), vec![PlaybackSpot::new("Bad", 2, 0)]);
    }

    #[test]
    fn test_spot_lookups() {
        let playlist = Playlist::build(demo(), &CommandRegistry::with_builtins());

        assert_eq!(playlist.index_of_spot(&PlaybackSpot::new("Demo", 2, 0)), Some(1));
        assert_eq!(playlist.index_of_spot(&PlaybackSpot::new("Other", 2, 0)), None);
        assert_eq!(playlist.index_at_or_after_line(0), 0);
        assert_eq!(playlist.index_at_or_after_line(2), 1);
        assert_eq!(playlist.index_at_or_after_line(4), 3);
    }
}
