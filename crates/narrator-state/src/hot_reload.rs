//! Resynchronizing playback after the played script's source changed.
//!
//! [`HotReloader`] remembers the line hashes of whatever script the player
//! last started. When an edited version of that script arrives, the first
//! changed line before the playback cursor decides where to roll back to;
//! edits at or after the cursor resume in place.

use std::sync::{Arc, Mutex, PoisonError};

use narrator_core::error::EngineError;
use narrator_core::observer::SubscriptionId;
use narrator_core::spot::PlaybackSpot;
use narrator_playback::command::Command;
use narrator_playback::events::PlayerEvent;
use narrator_playback::player::ScriptPlayer;
use narrator_playback::playlist::Playlist;
use narrator_script::{LineHash, Script};
use tracing::{info, instrument, warn};

use crate::manager::StateManager;

/// Snapshot a reload restores before resuming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackTarget {
    /// The snapshot captured right before the command at this spot.
    Command(PlaybackSpot),
    /// The snapshot captured when the script was entered. Used when no
    /// command precedes the edit; playback restarts from the first command.
    ScriptStart,
}

/// Where playback goes after a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncPlan {
    /// First line before the cursor whose content changed or vanished.
    pub edit_line: Option<usize>,
    /// Snapshot to restore before resuming; `None` when nothing before the
    /// cursor changed.
    pub rollback_to: Option<RollbackTarget>,
    /// Spot playback resumes from.
    pub resume: PlaybackSpot,
}

/// Result of [`HotReloader::reload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The edited script is not the one being played.
    Ignored,
    /// Playback was restarted according to the plan.
    Resumed(ResyncPlan),
}

/// Computes how to resume after `new_script` replaced the script whose
/// lines hashed to `old_hashes`.
///
/// Lines are compared by content hash only, so an edit that moves an
/// identical line into an earlier position goes unnoticed.
#[must_use]
pub fn plan_resync(
    old_hashes: &[LineHash],
    new_script: &Script,
    old_playlist: &Playlist,
    played_spot: &PlaybackSpot,
) -> ResyncPlan {
    let edit_line = (0..played_spot.line_index).find(|&index| {
        match (new_script.line(index), old_hashes.get(index)) {
            (Some(line), Some(old)) => line.line_hash() != old,
            _ => true,
        }
    });

    let Some(edit_line) = edit_line else {
        return ResyncPlan {
            edit_line: None,
            rollback_to: None,
            resume: played_spot.clone(),
        };
    };

    let before_edit = edit_line
        .checked_sub(1)
        .and_then(|line| old_playlist.command_before_line(line, usize::MAX));
    let (target, resume) = match before_edit {
        Some(command) => (
            RollbackTarget::Command(command.spot().clone()),
            command.spot().clone(),
        ),
        None => (
            RollbackTarget::ScriptStart,
            PlaybackSpot::new(played_spot.script_name.clone(), 0, 0),
        ),
    };
    ResyncPlan {
        edit_line: Some(edit_line),
        rollback_to: Some(target),
        resume,
    }
}

#[derive(Debug)]
struct PlayedSource {
    script_name: String,
    hashes: Vec<LineHash>,
}

/// Watches the player and resynchronizes it when its script is reloaded.
#[derive(Debug)]
pub struct HotReloader {
    player: ScriptPlayer,
    state: Arc<StateManager>,
    played: Arc<Mutex<Option<PlayedSource>>>,
    subscription: SubscriptionId,
}

impl HotReloader {
    /// Starts recording the line hashes of every script `player` plays.
    #[must_use]
    pub fn attach(player: ScriptPlayer, state: Arc<StateManager>) -> Arc<Self> {
        let played = Arc::new(Mutex::new(None));
        let sink = played.clone();
        let subscription = player.subscribe(move |event| {
            if let PlayerEvent::PlayStarted { script, .. } = event {
                *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(PlayedSource {
                    script_name: script.name().to_owned(),
                    hashes: script.line_hashes(),
                });
            }
        });
        Arc::new(Self {
            player,
            state,
            played,
            subscription,
        })
    }

    /// Stops watching the player.
    pub fn detach(&self) {
        self.player.unsubscribe(self.subscription);
    }

    /// Takes and restores the snapshot for `target`. A target missing from
    /// the history is logged and reported as not restored.
    async fn restore_target(
        &self,
        target: &RollbackTarget,
        script_name: &str,
    ) -> Result<bool, EngineError> {
        let taken = match target {
            RollbackTarget::Command(spot) => self
                .state
                .take_rollback_target(|snapshot| &snapshot.spot == spot),
            RollbackTarget::ScriptStart => self.state.take_script_entry(script_name),
        };
        match taken {
            Ok(snapshot) => {
                self.state.restore_snapshot(&snapshot).await?;
                Ok(true)
            }
            Err(EngineError::RollbackTargetNotFound) => {
                warn!(?target, "no snapshot for reload target; resuming without restore");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn recorded_hashes(&self, script_name: &str) -> Option<Vec<LineHash>> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|played| played.script_name == script_name)
            .map(|played| played.hashes.clone())
    }

    /// Applies an edited version of the played script.
    ///
    /// # Errors
    ///
    /// Returns restore failures other than a missing rollback target, which
    /// is logged and resumed from without restoring.
    #[instrument(skip(self, new_script), fields(script = new_script.name()))]
    pub async fn reload(&self, new_script: Arc<Script>) -> Result<ReloadOutcome, EngineError> {
        let Some(playlist) = self
            .player
            .playlist()
            .filter(|playlist| playlist.script().name() == new_script.name())
        else {
            return Ok(ReloadOutcome::Ignored);
        };

        let old_hashes = self
            .recorded_hashes(new_script.name())
            .unwrap_or_else(|| playlist.script().line_hashes());
        let played_spot = self
            .player
            .played_spot()
            .unwrap_or_else(|| PlaybackSpot::new(new_script.name(), 0, 0));
        let plan = plan_resync(&old_hashes, &new_script, &playlist, &played_spot);

        let was_waiting = self.player.is_waiting_for_input();
        if was_waiting {
            self.player.set_waiting_for_input_enabled(false);
        }
        self.player.stop();

        let restored = match &plan.rollback_to {
            Some(target) => self.restore_target(target, new_script.name()).await?,
            None => false,
        };

        let playlist = self.player.build_playlist(new_script);
        let index = match plan.rollback_to {
            Some(RollbackTarget::ScriptStart) => 0,
            _ => playlist
                .index_of_spot(&plan.resume)
                .unwrap_or_else(|| playlist.index_at_or_after_line(plan.resume.line_index)),
        };
        let resumed_at = playlist
            .get(index)
            .map_or_else(|| plan.resume.clone(), |entry| entry.spot().clone());
        info!(
            edit_line = ?plan.edit_line,
            resume = %resumed_at,
            was_waiting,
            "script reloaded"
        );
        self.player.play(playlist, index);
        if restored {
            self.state.announce_rollback(&resumed_at);
        }
        Ok(ReloadOutcome::Resumed(plan))
    }
}

#[cfg(test)]
mod tests {
    use narrator_core::value::ScriptValue;
    use narrator_playback::registry::CommandRegistry;

    use super::*;
    use crate::config::StateConfig;
    use crate::manager::StateEvent;
    use crate::testing::{Engine, is_waiting};

    const SOURCE: &str = "@set n=1\nFirst\n@set n=2\nSecond";

    fn playlist_of(source: &str) -> Playlist {
        Playlist::build(
            Arc::new(Script::parse("Demo", source)),
            &CommandRegistry::with_builtins(),
        )
    }

    #[test]
    fn test_edit_after_cursor_resumes_in_place() {
        // Arrange
        let old = playlist_of(SOURCE);
        let edited = Script::parse("Demo", "@set n=1\nFirst\n@set n=2\nSecond, edited");
        let cursor = PlaybackSpot::new("Demo", 1, 0);

        // Act
        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        // Assert
        assert_eq!(plan.edit_line, None);
        assert_eq!(plan.rollback_to, None);
        assert_eq!(plan.resume, cursor);
    }

    #[test]
    fn test_edit_before_cursor_targets_last_command_before_edit() {
        let old = playlist_of(SOURCE);
        let edited = Script::parse("Demo", "@set n=1\nFirst, edited\n@set n=2\nSecond");
        let cursor = PlaybackSpot::new("Demo", 3, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, Some(1));
        assert_eq!(
            plan.rollback_to,
            Some(RollbackTarget::Command(PlaybackSpot::new("Demo", 0, 0)))
        );
        assert_eq!(plan.resume, PlaybackSpot::new("Demo", 0, 0));
    }

    #[test]
    fn test_edit_of_first_line_targets_start() {
        let old = playlist_of(SOURCE);
        let edited = Script::parse("Demo", "@set n=5\nFirst\n@set n=2\nSecond");
        let cursor = PlaybackSpot::new("Demo", 3, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, Some(0));
        assert_eq!(plan.rollback_to, Some(RollbackTarget::ScriptStart));
        assert_eq!(plan.resume, PlaybackSpot::new("Demo", 0, 0));
    }

    #[test]
    fn test_edit_ahead_of_first_command_restarts_from_script_start() {
        let old = playlist_of("# Start\n; note\nHello\nWorld");
        let edited = Script::parse("Demo", "# Start\n@set x=1\nHello\nWorld");
        let cursor = PlaybackSpot::new("Demo", 3, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, Some(1));
        assert_eq!(plan.rollback_to, Some(RollbackTarget::ScriptStart));
        assert_eq!(plan.resume, PlaybackSpot::new("Demo", 0, 0));
    }

    #[test]
    fn test_whitespace_only_changes_are_not_edits() {
        let old = playlist_of(SOURCE);
        let edited = Script::parse("Demo", "  @set n=1\nFirst   \n@set n=2\nSecond");
        let cursor = PlaybackSpot::new("Demo", 3, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, None);
    }

    #[test]
    fn test_invalid_new_line_counts_as_edit() {
        let old = playlist_of(SOURCE);
        let edited = Script::parse("Demo", "@set n=1\n@\n@set n=2\nSecond");
        let cursor = PlaybackSpot::new("Demo", 3, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, Some(1));
    }

    #[test]
    fn test_unchanged_invalid_line_before_cursor_is_not_an_edit() {
        let old = playlist_of("@set n=1\n@\nFirst\nSecond");
        let edited = Script::parse("Demo", "@set n=1\n@\nFirst\nSecond, edited");
        let cursor = PlaybackSpot::new("Demo", 2, 0);

        let plan = plan_resync(&old.script().line_hashes(), &edited, &old, &cursor);

        assert_eq!(plan.edit_line, None);
        assert_eq!(plan.rollback_to, None);
        assert_eq!(plan.resume, cursor);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_rolls_back_and_replays_edited_line() {
        // Arrange
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        engine.library.insert_source("Demo", SOURCE);
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;
        assert_eq!(
            engine.player.context().variables().get("n"),
            Some(ScriptValue::Integer(2))
        );

        // Act
        let edited = engine
            .library
            .insert_source("Demo", "@set n=1\nFirst!\n@set n=2\nSecond");
        let outcome = reloader.reload(edited).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        // Assert
        let ReloadOutcome::Resumed(plan) = outcome else {
            panic!("expected a resumed reload");
        };
        assert_eq!(plan.edit_line, Some(1));
        assert_eq!(engine.player.played_spot(), Some(PlaybackSpot::new("Demo", 1, 0)));
        assert_eq!(
            engine.player.context().variables().get("n"),
            Some(ScriptValue::Integer(1))
        );
        assert_eq!(
            engine.presenter.printed_texts().last().map(String::as_str),
            Some("First!")
        );
        assert_eq!(engine.state.rollback_steps(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_after_cursor_keeps_state() {
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        engine.library.insert_source("Demo", SOURCE);
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        let edited = engine
            .library
            .insert_source("Demo", "@set n=1\nFirst\n@set n=3\nSecond");
        let outcome = reloader.reload(edited).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;

        assert!(matches!(outcome, ReloadOutcome::Resumed(ResyncPlan { rollback_to: None, .. })));
        assert_eq!(
            engine.player.context().variables().get("n"),
            Some(ScriptValue::Integer(3))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_onto_shorter_script_rolls_back_to_last_kept_line() {
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        engine.library.insert_source("Demo", SOURCE);
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;

        let edited = engine.library.insert_source("Demo", "@set n=1\nFirst");
        let outcome = reloader.reload(edited).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        let ReloadOutcome::Resumed(plan) = outcome else {
            panic!("expected a resumed reload");
        };
        assert_eq!(plan.edit_line, Some(2));
        assert_eq!(plan.resume, PlaybackSpot::new("Demo", 1, 0));
        assert_eq!(
            engine.player.context().variables().get("n"),
            Some(ScriptValue::Integer(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_with_line_inserted_ahead_of_first_command_replays_from_start() {
        // Arrange
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        let rollbacks = Arc::new(Mutex::new(Vec::new()));
        let sink = rollbacks.clone();
        engine.state.subscribe(move |event| {
            if let StateEvent::RolledBack { spot } = event {
                sink.lock().unwrap().push(spot.clone());
            }
        });
        engine.library.insert_source("Demo", "# Start\n; note\nHello\nWorld");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;

        // Act
        let edited = engine
            .library
            .insert_source("Demo", "# Start\n@set x=1\nHello\nWorld");
        reloader.reload(edited).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        // Assert
        assert_eq!(
            engine.player.context().variables().get("x"),
            Some(ScriptValue::Integer(1))
        );
        assert_eq!(engine.player.played_spot(), Some(PlaybackSpot::new("Demo", 2, 0)));
        assert_eq!(engine.state.rollback_steps(), 2);
        assert_eq!(
            *rollbacks.lock().unwrap(),
            vec![PlaybackSpot::new("Demo", 1, 0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_without_edit_before_cursor_reports_no_rollback() {
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        let rollbacks = Arc::new(Mutex::new(Vec::new()));
        let sink = rollbacks.clone();
        engine.state.subscribe(move |event| {
            if let StateEvent::RolledBack { spot } = event {
                sink.lock().unwrap().push(spot.clone());
            }
        });
        engine.library.insert_source("Demo", SOURCE);
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        let edited = engine
            .library
            .insert_source("Demo", "@set n=1\nFirst\n@set n=2\nSecond!");
        reloader.reload(edited).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        assert!(rollbacks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_of_other_script_is_ignored() {
        let engine = Engine::new(StateConfig::default());
        let reloader = HotReloader::attach(engine.player.clone(), engine.state.clone());
        engine.library.insert_source("Demo", SOURCE);
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        let other = engine.library.insert_source("Other", "Elsewhere");
        let outcome = reloader.reload(other).await.unwrap();

        assert_eq!(outcome, ReloadOutcome::Ignored);
        assert!(engine.player.is_waiting_for_input());
        reloader.detach();
    }
}
