//! The state manager.
//!
//! Owns the snapshot history and the registered subsystems. Acts as the
//! player's [`PlaybackHooks`], so a snapshot is captured right before every
//! dispatched command and script-driven resets land here.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use narrator_core::clock::Clock;
use narrator_core::error::EngineError;
use narrator_core::observer::{Observers, SubscriptionId};
use narrator_core::repository::{
    SaveSlotStore, format_slot_id, slot_matches_pattern, slot_pattern,
};
use narrator_core::snapshot::{GameSave, StateSnapshot};
use narrator_core::spot::PlaybackSpot;
use narrator_core::subsystem::StatefulSubsystem;
use narrator_playback::player::{PlaybackHooks, ScriptPlayer};
use tracing::{debug, error, info, instrument};

use crate::config::StateConfig;
use crate::history::SnapshotHistory;

/// Lifecycle notifications for save, load, reset and rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A save into `slot_id` began.
    GameSaveStarted {
        /// Target slot.
        slot_id: String,
    },
    /// A save into `slot_id` completed.
    GameSaveFinished {
        /// Target slot.
        slot_id: String,
    },
    /// Loading `slot_id` began.
    GameLoadStarted {
        /// Source slot.
        slot_id: String,
    },
    /// Loading `slot_id` completed and playback resumed at `spot`.
    GameLoadFinished {
        /// Source slot.
        slot_id: String,
        /// Resume position.
        spot: PlaybackSpot,
    },
    /// Subsystems were reset and history cleared.
    ResetFinished,
    /// Playback was rolled back to `spot`.
    RolledBack {
        /// Resume position.
        spot: PlaybackSpot,
    },
}

/// Captures, restores and persists engine state.
pub struct StateManager {
    config: StateConfig,
    clock: Arc<dyn Clock>,
    slots: Arc<dyn SaveSlotStore>,
    subsystems: RwLock<Vec<Arc<dyn StatefulSubsystem>>>,
    history: Mutex<SnapshotHistory>,
    observers: Observers<StateEvent>,
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("config", &self.config)
            .field("subsystems", &self.subsystem_ids())
            .field("rollback_steps", &self.rollback_steps())
            .finish_non_exhaustive()
    }
}

impl StateManager {
    /// Creates a manager with no registered subsystems.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when `config` is invalid.
    pub fn new(
        config: StateConfig,
        clock: Arc<dyn Clock>,
        slots: Arc<dyn SaveSlotStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            history: Mutex::new(SnapshotHistory::new(config.rollback_capacity)),
            config,
            clock,
            slots,
            subsystems: RwLock::new(Vec::new()),
            observers: Observers::new(),
        })
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    fn history(&self) -> MutexGuard<'_, SnapshotHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subsystems(&self) -> Vec<Arc<dyn StatefulSubsystem>> {
        self.subsystems
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- registration ----------------------------------------------------

    /// Adds a subsystem. Subsystems are captured and restored in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the id is already taken.
    pub fn register(&self, subsystem: Arc<dyn StatefulSubsystem>) -> Result<(), EngineError> {
        let mut subsystems = self
            .subsystems
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = subsystem.subsystem_id().to_owned();
        if subsystems.iter().any(|existing| existing.subsystem_id() == id) {
            return Err(EngineError::Validation(format!(
                "subsystem `{id}` is already registered"
            )));
        }
        debug!(subsystem = %id, "subsystem registered");
        subsystems.push(subsystem);
        Ok(())
    }

    /// Removes a subsystem. Returns `false` if it was not registered.
    pub fn unregister(&self, subsystem_id: &str) -> bool {
        let mut subsystems = self
            .subsystems
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subsystems.len();
        subsystems.retain(|subsystem| subsystem.subsystem_id() != subsystem_id);
        subsystems.len() != before
    }

    /// Ids of registered subsystems, in registration order.
    #[must_use]
    pub fn subsystem_ids(&self) -> Vec<String> {
        self.subsystems()
            .iter()
            .map(|subsystem| subsystem.subsystem_id().to_owned())
            .collect()
    }

    // --- observers -------------------------------------------------------

    /// Registers a callback for state events.
    pub fn subscribe(
        &self,
        callback: impl Fn(&StateEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Removes a callback registered with [`StateManager::subscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // --- snapshots -------------------------------------------------------

    /// Serializes every subsystem into a snapshot tagged with `spot` and
    /// appends it to the history, evicting the oldest on overflow.
    ///
    /// # Errors
    ///
    /// Returns the first serialization failure; nothing is appended then.
    pub fn capture_snapshot(&self, spot: &PlaybackSpot) -> Result<(), EngineError> {
        let mut states = BTreeMap::new();
        for subsystem in self.subsystems() {
            states.insert(subsystem.subsystem_id().to_owned(), subsystem.save_state()?);
        }
        let snapshot = StateSnapshot {
            spot: spot.clone(),
            captured_at: self.clock.now(),
            subsystems: states,
        };
        if let Some(evicted) = self.history().push(snapshot) {
            debug!(evicted = %evicted.spot, "oldest snapshot evicted");
        }
        Ok(())
    }

    /// Number of snapshots available as rollback targets.
    #[must_use]
    pub fn rollback_steps(&self) -> usize {
        self.history().len()
    }

    /// Copy of the history, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<StateSnapshot> {
        self.history().iter().cloned().collect()
    }

    /// Whether some retained snapshot matches `predicate`.
    pub fn can_rollback(&self, predicate: impl Fn(&StateSnapshot) -> bool) -> bool {
        self.history().find_newest(predicate).is_some()
    }

    /// Removes the newest snapshot matching `predicate` and every newer one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RollbackTargetNotFound`] when nothing matches;
    /// the history is unchanged then.
    pub fn take_rollback_target(
        &self,
        predicate: impl Fn(&StateSnapshot) -> bool,
    ) -> Result<StateSnapshot, EngineError> {
        self.history()
            .take_newest(predicate)
            .ok_or(EngineError::RollbackTargetNotFound)
    }

    /// Removes the snapshot captured when `script_name` was last entered and
    /// every newer one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RollbackTargetNotFound`] when the newest
    /// snapshot belongs to another script or the history is empty.
    pub fn take_script_entry(&self, script_name: &str) -> Result<StateSnapshot, EngineError> {
        self.history()
            .take_script_entry(script_name)
            .ok_or(EngineError::RollbackTargetNotFound)
    }

    /// Reports a completed rollback that resumed at `spot`.
    pub fn announce_rollback(&self, spot: &PlaybackSpot) {
        info!(spot = %spot, "rolled back");
        self.observers
            .notify(&StateEvent::RolledBack { spot: spot.clone() });
    }

    /// Loads every registered subsystem from `snapshot`. Subsystems missing
    /// from the snapshot are reset.
    ///
    /// # Errors
    ///
    /// Returns the first subsystem that fails to load.
    pub async fn restore_snapshot(&self, snapshot: &StateSnapshot) -> Result<(), EngineError> {
        for subsystem in self.subsystems() {
            match snapshot.state_of(subsystem.subsystem_id()) {
                Some(state) => subsystem.load_state(state).await?,
                None => subsystem.reset_state().await,
            }
        }
        Ok(())
    }

    /// Rolls playback back to the newest snapshot matching `predicate`:
    /// stops the player, restores every subsystem and resumes exactly at the
    /// snapshot's spot. The target and every newer snapshot leave the
    /// history; resumed playback captures them again.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RollbackTargetNotFound`] when no retained
    /// snapshot matches, leaving playback untouched.
    #[instrument(skip(self, predicate, player))]
    pub async fn rollback(
        &self,
        predicate: impl Fn(&StateSnapshot) -> bool + Send,
        player: &ScriptPlayer,
    ) -> Result<PlaybackSpot, EngineError> {
        let target = self.take_rollback_target(predicate)?;
        player.stop();
        self.restore_snapshot(&target).await?;
        player.resume_at(&target.spot).await?;

        self.announce_rollback(&target.spot);
        Ok(target.spot)
    }

    /// Resets every registered subsystem except `excluded` (the configured
    /// exclusions when `None`), clears the history, then runs
    /// `continuation`.
    ///
    /// # Errors
    ///
    /// Returns whatever `continuation` returns.
    #[instrument(skip(self, continuation))]
    pub async fn reset_state<F, Fut>(
        &self,
        excluded: Option<&[String]>,
        continuation: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(), EngineError>> + Send,
    {
        let excluded = excluded.unwrap_or(&self.config.reset_excluded);
        for subsystem in self.subsystems() {
            if excluded.iter().any(|id| id == subsystem.subsystem_id()) {
                continue;
            }
            subsystem.reset_state().await;
        }
        self.history().clear();

        info!(?excluded, "state reset");
        self.observers.notify(&StateEvent::ResetFinished);
        continuation().await
    }

    // --- save slots ------------------------------------------------------

    /// Writes the newest snapshots into `slot_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when nothing has been played yet,
    /// or the slot store's error.
    #[instrument(skip(self))]
    pub async fn save_game(&self, slot_id: &str) -> Result<GameSave, EngineError> {
        self.observers.notify(&StateEvent::GameSaveStarted {
            slot_id: slot_id.to_owned(),
        });
        let snapshots = self.history().newest_n(self.config.saved_rollback_steps);
        if snapshots.is_empty() {
            return Err(EngineError::Validation(
                "nothing has been played yet".to_owned(),
            ));
        }
        let save = GameSave {
            saved_at: self.clock.now(),
            snapshots,
        };
        self.slots.save(slot_id, &save).await?;

        info!(slot = slot_id, snapshots = save.snapshots.len(), "game saved");
        self.observers.notify(&StateEvent::GameSaveFinished {
            slot_id: slot_id.to_owned(),
        });
        Ok(save)
    }

    /// Saves into the first quick slot, shifting older quick saves up and
    /// dropping the one beyond the limit. Returns the slot id.
    ///
    /// # Errors
    ///
    /// Same as [`StateManager::save_game`].
    #[instrument(skip(self))]
    pub async fn quick_save(&self) -> Result<String, EngineError> {
        let nothing_played = self.history().is_empty();
        if nothing_played {
            return Err(EngineError::Validation(
                "nothing has been played yet".to_owned(),
            ));
        }
        let mask = &self.config.quick_save_slot_mask;
        for number in (1..self.config.quick_save_slot_limit).rev() {
            let from = format_slot_id(mask, number);
            if self.slots.slot_exists(&from).await? {
                let save = self.slots.load(&from).await?;
                self.slots
                    .save(&format_slot_id(mask, number + 1), &save)
                    .await?;
            }
        }
        let slot_id = format_slot_id(mask, 1);
        self.save_game(&slot_id).await?;
        Ok(slot_id)
    }

    /// Loads `slot_id`: stops the player, restores the resume snapshot,
    /// replaces the history with the saved one and resumes playback.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SlotNotFound`] for a missing slot,
    /// [`EngineError::Validation`] for an empty one, or restore/resume
    /// errors.
    #[instrument(skip(self, player))]
    pub async fn load_game(
        &self,
        slot_id: &str,
        player: &ScriptPlayer,
    ) -> Result<PlaybackSpot, EngineError> {
        self.observers.notify(&StateEvent::GameLoadStarted {
            slot_id: slot_id.to_owned(),
        });
        let save = self.slots.load(slot_id).await?;
        let Some((resume, earlier)) = save.snapshots.split_last() else {
            return Err(EngineError::Validation(format!(
                "save slot `{slot_id}` holds no snapshots"
            )));
        };

        player.stop();
        self.restore_snapshot(resume).await?;
        self.history().replace(earlier.iter().cloned());
        player.resume_at(&resume.spot).await?;

        info!(slot = slot_id, spot = %resume.spot, "game loaded");
        self.observers.notify(&StateEvent::GameLoadFinished {
            slot_id: slot_id.to_owned(),
            spot: resume.spot.clone(),
        });
        Ok(resume.spot.clone())
    }

    /// Loads the newest quick save.
    ///
    /// # Errors
    ///
    /// Same as [`StateManager::load_game`].
    pub async fn quick_load(&self, player: &ScriptPlayer) -> Result<PlaybackSpot, EngineError> {
        let slot_id = format_slot_id(&self.config.quick_save_slot_mask, 1);
        self.load_game(&slot_id, player).await
    }

    /// Every stored slot id.
    ///
    /// # Errors
    ///
    /// Returns the slot store's error.
    pub async fn list_saves(&self) -> Result<Vec<String>, EngineError> {
        self.slots.list_slots().await
    }

    /// Whether any regular or quick save exists.
    ///
    /// # Errors
    ///
    /// Returns the slot store's error.
    pub async fn any_save_exists(&self) -> Result<bool, EngineError> {
        let patterns = [
            slot_pattern(&self.config.save_slot_mask),
            slot_pattern(&self.config.quick_save_slot_mask),
        ];
        let slots = self.slots.list_slots().await?;
        Ok(slots.iter().any(|slot| {
            patterns
                .iter()
                .any(|pattern| slot_matches_pattern(pattern, slot))
        }))
    }

    /// Whether `slot_id` exists.
    ///
    /// # Errors
    ///
    /// Returns the slot store's error.
    pub async fn save_exists(&self, slot_id: &str) -> Result<bool, EngineError> {
        self.slots.slot_exists(slot_id).await
    }

    /// Deletes `slot_id`.
    ///
    /// # Errors
    ///
    /// Returns the slot store's error.
    #[instrument(skip(self))]
    pub async fn delete_save(&self, slot_id: &str) -> Result<(), EngineError> {
        self.slots.delete(slot_id).await?;
        info!(slot = slot_id, "save deleted");
        Ok(())
    }
}

#[async_trait]
impl PlaybackHooks for StateManager {
    fn before_dispatch(&self, spot: &PlaybackSpot) {
        if let Err(err) = self.capture_snapshot(spot) {
            error!(spot = %spot, error = %err, "snapshot capture failed");
        }
    }

    async fn reset_state(&self, excluded: Option<Vec<String>>) -> Result<(), EngineError> {
        StateManager::reset_state(self, excluded.as_deref(), || async { Ok(()) }).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use narrator_core::value::ScriptValue;
    use narrator_playback::events::PlayerStatus;
    use narrator_test_support::{CounterSubsystem, FailingSlotStore, FixedClock, InMemorySlotStore};

    use super::*;
    use crate::testing::{Engine, is_stopped, is_waiting};

    fn bare_manager(config: StateConfig) -> StateManager {
        StateManager::new(
            config,
            Arc::new(FixedClock::epoch()),
            Arc::new(InMemorySlotStore::new()),
        )
        .unwrap()
    }

    fn spot(line: usize) -> PlaybackSpot {
        PlaybackSpot::new("Demo", line, 0)
    }

    #[test]
    fn test_history_capacity_two_keeps_newest_and_rejects_old_target() {
        // Arrange
        let manager = bare_manager(StateConfig {
            rollback_capacity: 2,
            ..StateConfig::default()
        });

        // Act
        for line in [0, 1, 2] {
            manager.capture_snapshot(&spot(line)).unwrap();
        }

        // Assert
        let kept: Vec<PlaybackSpot> = manager.snapshots().into_iter().map(|s| s.spot).collect();
        assert_eq!(kept, vec![spot(1), spot(2)]);
        assert_eq!(
            manager.take_rollback_target(|s| s.spot == spot(0)).unwrap_err(),
            EngineError::RollbackTargetNotFound
        );
        assert_eq!(manager.rollback_steps(), 2);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let manager = bare_manager(StateConfig::default());
        manager
            .register(Arc::new(CounterSubsystem::new("counter")))
            .unwrap();

        let err = manager
            .register(Arc::new(CounterSubsystem::new("counter")))
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(manager.unregister("counter"));
        assert!(!manager.unregister("counter"));
    }

    #[tokio::test]
    async fn test_restore_resets_subsystems_missing_from_snapshot() {
        // Arrange
        let manager = bare_manager(StateConfig::default());
        manager.capture_snapshot(&spot(0)).unwrap();
        let counter = Arc::new(CounterSubsystem::new("late"));
        counter.set(9);
        manager.register(counter.clone()).unwrap();
        let snapshot = manager.snapshots().remove(0);

        // Act
        manager.restore_snapshot(&snapshot).await.unwrap();

        // Assert
        assert_eq!(counter.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_round_trip_restores_spot_and_state() {
        // Arrange
        let engine = Engine::new(StateConfig::default());
        let counter = Arc::new(CounterSubsystem::new("counter"));
        engine.state.register(counter.clone()).unwrap();
        engine.library.insert_source("Demo", "First\nSecond\nThird");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        let captured_at = engine.player.played_spot().unwrap();

        counter.set(5);
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;
        counter.set(7);
        assert_eq!(engine.state.rollback_steps(), 2);

        // Act
        let spot = engine
            .state
            .rollback(|s| s.spot.line_index == 0, &engine.player)
            .await
            .unwrap();
        engine.player.wait_until(is_waiting).await;

        // Assert
        assert_eq!(spot, captured_at);
        assert_eq!(engine.player.played_spot(), Some(captured_at));
        assert_eq!(counter.get(), 0);
        assert_eq!(engine.state.rollback_steps(), 1);
        assert_eq!(
            engine.presenter.printed_texts(),
            vec!["First".to_owned(), "Second".to_owned(), "First".to_owned()]
        );
        assert_eq!(engine.player.context().backlog().messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_to_unknown_target_leaves_playback_alone() {
        let engine = Engine::new(StateConfig::default());
        engine.library.insert_source("Demo", "Only");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        let err = engine
            .state
            .rollback(|s| s.spot.line_index == 42, &engine.player)
            .await
            .unwrap_err();

        assert_eq!(err, EngineError::RollbackTargetNotFound);
        assert_eq!(engine.player.status(), PlayerStatus::WaitingForInput);
        assert_eq!(engine.state.rollback_steps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_keeps_variables_and_runs_continuation() {
        // Arrange
        let engine = Engine::new(StateConfig::default());
        engine.library.insert_source("Demo", "@set seen=true\nHello");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();

        // Act
        engine
            .state
            .reset_state(None, || async move {
                *flag.lock().unwrap() = true;
                Ok(())
            })
            .await
            .unwrap();

        // Assert
        assert!(*ran.lock().unwrap());
        assert_eq!(engine.state.rollback_steps(), 0);
        let context = engine.player.context();
        assert_eq!(context.variables().get("seen"), Some(ScriptValue::Boolean(true)));
        assert!(context.backlog().messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_state_command_clears_history_and_continues() {
        let engine = Engine::new(StateConfig::default());
        engine
            .library
            .insert_source("Demo", "Before\n@resetState\nAfter");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;

        let context = engine.player.context();
        let texts: Vec<String> = context.backlog().messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["After".to_owned()]);
        assert_eq!(engine.state.rollback_steps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_and_load_resume_where_saved() {
        // Arrange
        let engine = Engine::new(StateConfig::default());
        engine
            .library
            .insert_source("Demo", "@set score=1\nFirst\n@set score=2\nSecond");
        engine.player.preload_and_play("Demo", None).await.unwrap();
        engine.player.wait_until(is_waiting).await;
        let save = engine.state.save_game("GameSave1").await.unwrap();
        engine.player.continue_input();
        engine.player.wait_until(is_waiting).await;
        assert_eq!(
            engine.player.context().variables().get("score"),
            Some(ScriptValue::Integer(2))
        );

        // Act
        let spot = engine.state.load_game("GameSave1", &engine.player).await.unwrap();
        engine.player.wait_until(is_waiting).await;

        // Assert
        assert_eq!(save.snapshots.len(), 1);
        assert_eq!(spot, PlaybackSpot::new("Demo", 1, 0));
        assert_eq!(engine.player.played_spot(), Some(spot));
        assert_eq!(
            engine.player.context().variables().get("score"),
            Some(ScriptValue::Integer(1))
        );
        assert!(engine.state.any_save_exists().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_saves_rotate_within_limit() {
        // Arrange
        let engine = Engine::new(StateConfig {
            quick_save_slot_limit: 2,
            ..StateConfig::default()
        });
        engine.library.insert_source("Demo", "One\nTwo\nThree");
        engine.player.preload_and_play("Demo", None).await.unwrap();

        // Act
        for _ in 0..3 {
            engine.player.wait_until(is_waiting).await;
            engine.state.quick_save().await.unwrap();
            engine.player.continue_input();
        }
        engine.player.wait_until(is_stopped).await;

        // Assert
        let mut slots = engine.state.list_saves().await.unwrap();
        slots.sort();
        assert_eq!(slots, vec!["GameQuickSave1".to_owned(), "GameQuickSave2".to_owned()]);
        let newest = engine.slots.get("GameQuickSave1").unwrap();
        let older = engine.slots.get("GameQuickSave2").unwrap();
        assert_eq!(newest.resume_snapshot().unwrap().spot.line_index, 2);
        assert_eq!(older.resume_snapshot().unwrap().spot.line_index, 1);

        let spot = engine.state.quick_load(&engine.player).await.unwrap();
        assert_eq!(spot.line_index, 2);
    }

    #[tokio::test]
    async fn test_save_events_and_empty_history() {
        let manager = bare_manager(StateConfig::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        assert!(matches!(
            manager.save_game("GameSave1").await,
            Err(EngineError::Validation(_))
        ));
        manager.capture_snapshot(&spot(0)).unwrap();
        manager.save_game("GameSave1").await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                StateEvent::GameSaveStarted { slot_id: "GameSave1".to_owned() },
                StateEvent::GameSaveStarted { slot_id: "GameSave1".to_owned() },
                StateEvent::GameSaveFinished { slot_id: "GameSave1".to_owned() },
            ]
        );
    }

    #[tokio::test]
    async fn test_slot_store_failures_propagate() {
        let manager = StateManager::new(
            StateConfig::default(),
            Arc::new(FixedClock::epoch()),
            Arc::new(FailingSlotStore),
        )
        .unwrap();
        manager.capture_snapshot(&spot(0)).unwrap();

        let err = manager.save_game("GameSave1").await.unwrap_err();

        assert!(matches!(err, EngineError::Infrastructure(_)));
        assert!(manager.any_save_exists().await.is_err());
    }

    #[tokio::test]
    async fn test_loading_missing_slot_fails() {
        let manager = bare_manager(StateConfig::default());
        let engine = Engine::new(StateConfig::default());

        let err = manager.load_game("GameSave9", &engine.player).await.unwrap_err();

        assert_eq!(err, EngineError::SlotNotFound("GameSave9".to_owned()));
        assert!(!manager.any_save_exists().await.unwrap());
    }
}
