//! The script player.
//!
//! One [`ScriptPlayer`] walks one playlist at a time. Each `play` call
//! replaces the player state wholesale, cancels the previous invocation and
//! spawns a fresh scheduling loop. Only that loop advances the played
//! index; everything else goes through `play`, `stop` or the input signals.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use narrator_core::cancel::{CancelSource, CancelToken};
use narrator_core::error::EngineError;
use narrator_core::observer::{Observers, SubscriptionId};
use narrator_core::spot::PlaybackSpot;
use narrator_script::{ParameterValue, Script};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::{Command, CommandOutcome, ExecutionState, NavigationRequest, ResetRequest};
use crate::config::PlayerConfig;
use crate::context::CommandContext;
use crate::events::{PlayerEvent, PlayerStatus};
use crate::library::ScriptProvider;
use crate::pacing::PlaybackMode;
use crate::playlist::Playlist;
use crate::registry::CommandRegistry;

/// Engine hooks invoked by the scheduling loop.
#[async_trait]
pub trait PlaybackHooks: Send + Sync {
    /// Runs right before the command at `spot` is dispatched.
    fn before_dispatch(&self, spot: &PlaybackSpot);

    /// Resets services except `excluded`; `None` keeps the configured
    /// default exclusions.
    async fn reset_state(&self, excluded: Option<Vec<String>>) -> Result<(), EngineError>;
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl PlaybackHooks for NoopHooks {
    fn before_dispatch(&self, _spot: &PlaybackSpot) {}

    async fn reset_state(&self, _excluded: Option<Vec<String>>) -> Result<(), EngineError> {
        Ok(())
    }
}

struct PlayerState {
    playlist: Option<Arc<Playlist>>,
    played_index: Option<usize>,
    generation: u64,
    play_id: Option<Uuid>,
    cancel: Option<CancelSource>,
}

struct Shared {
    context: Arc<CommandContext>,
    provider: Arc<dyn ScriptProvider>,
    registry: Arc<CommandRegistry>,
    config: PlayerConfig,
    hooks: Arc<dyn PlaybackHooks>,
    state: Mutex<PlayerState>,
    status: watch::Sender<PlayerStatus>,
    observers: Observers<PlayerEvent>,
    held: Mutex<Option<Arc<Playlist>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Finished,
    Cancelled,
    Superseded,
}

/// Plays playlists. Cheap to clone; clones share the same player.
#[derive(Clone)]
pub struct ScriptPlayer {
    shared: Arc<Shared>,
}

impl fmt::Debug for ScriptPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptPlayer")
            .field("status", &self.status())
            .field("played_spot", &self.played_spot())
            .finish_non_exhaustive()
    }
}

impl ScriptPlayer {
    /// Creates an idle player.
    #[must_use]
    pub fn new(
        context: Arc<CommandContext>,
        provider: Arc<dyn ScriptProvider>,
        registry: Arc<CommandRegistry>,
        config: PlayerConfig,
        hooks: Arc<dyn PlaybackHooks>,
    ) -> Self {
        let (status, _rx) = watch::channel(PlayerStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                context,
                provider,
                registry,
                config,
                hooks,
                state: Mutex::new(PlayerState {
                    playlist: None,
                    played_index: None,
                    generation: 0,
                    play_id: None,
                    cancel: None,
                }),
                status,
                observers: Observers::new(),
                held: Mutex::new(None),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Collaborators shared with commands.
    #[must_use]
    pub fn context(&self) -> &Arc<CommandContext> {
        &self.shared.context
    }

    /// Player tunables.
    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    /// Builds a playlist with this player's command registry.
    #[must_use]
    pub fn build_playlist(&self, script: Arc<Script>) -> Arc<Playlist> {
        Arc::new(Playlist::build(script, &self.shared.registry))
    }

    // --- queries ---------------------------------------------------------

    /// Current state-graph position.
    #[must_use]
    pub fn status(&self) -> PlayerStatus {
        *self.shared.status.borrow()
    }

    /// Whether the player waits for a continue signal.
    #[must_use]
    pub fn is_waiting_for_input(&self) -> bool {
        self.status() == PlayerStatus::WaitingForInput
    }

    /// Current playback mode.
    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.shared.context.pacing().mode()
    }

    /// The active playlist.
    #[must_use]
    pub fn playlist(&self) -> Option<Arc<Playlist>> {
        self.lock().playlist.clone()
    }

    /// The script of the active playlist.
    #[must_use]
    pub fn played_script(&self) -> Option<Arc<Script>> {
        self.lock()
            .playlist
            .as_ref()
            .map(|playlist| playlist.script().clone())
    }

    /// Index of the command most recently dispatched in this play.
    #[must_use]
    pub fn played_index(&self) -> Option<usize> {
        self.lock().played_index
    }

    /// The command most recently dispatched in this play.
    #[must_use]
    pub fn played_command(&self) -> Option<Arc<dyn Command>> {
        let state = self.lock();
        let index = state.played_index?;
        state
            .playlist
            .as_ref()?
            .get(index)
            .map(|entry| entry.command().clone())
    }

    /// Spot of the command most recently dispatched in this play.
    #[must_use]
    pub fn played_spot(&self) -> Option<PlaybackSpot> {
        self.played_command().map(|command| command.spot().clone())
    }

    /// Id of the current play invocation.
    #[must_use]
    pub fn play_id(&self) -> Option<Uuid> {
        self.lock().play_id
    }

    /// Resolves once the status satisfies `predicate`.
    pub async fn wait_until(&self, predicate: impl Fn(PlayerStatus) -> bool) -> PlayerStatus {
        let mut rx = self.shared.status.subscribe();
        let reached = rx.wait_for(|status| predicate(*status)).await.map(|status| *status);
        reached.unwrap_or_else(|_| self.status())
    }

    // --- observers -------------------------------------------------------

    /// Registers a callback for player events.
    pub fn subscribe(&self, callback: impl Fn(&PlayerEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.shared.observers.subscribe(callback)
    }

    /// Removes a callback registered with [`ScriptPlayer::subscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    // --- control ---------------------------------------------------------

    /// Replaces the active playlist and starts executing from
    /// `start_index`. Cancels whatever the previous play was doing.
    pub fn play(&self, playlist: Arc<Playlist>, start_index: usize) -> Uuid {
        let source = CancelSource::new();
        let token = source.token();
        let play_id = Uuid::new_v4();
        let generation = {
            let mut state = self.lock();
            if let Some(previous) = state.cancel.take() {
                previous.cancel();
            }
            let generation = state.generation + 1;
            *state = PlayerState {
                playlist: Some(playlist.clone()),
                played_index: None,
                generation,
                play_id: Some(play_id),
                cancel: Some(source),
            };
            self.shared.status.send_replace(PlayerStatus::Playing);
            generation
        };
        playlist.reset_states();

        info!(
            %play_id,
            script = playlist.script().name(),
            start_index,
            "play started"
        );
        self.shared.observers.notify(&PlayerEvent::PlayStarted {
            script: playlist.script().clone(),
            play_id,
            start_index,
        });
        tokio::spawn(self.clone().run(playlist, start_index, generation, token));
        play_id
    }

    /// Builds, preloads and plays `script` from the first command on or
    /// after `line_index`.
    pub async fn play_script(&self, script: Arc<Script>, line_index: usize) -> Uuid {
        let playlist = self.build_playlist(script);
        self.preload(&playlist).await;
        let start = playlist.index_at_or_after_line(line_index);
        self.play(playlist, start)
    }

    /// Loads `script_name` through the script provider and plays it from
    /// `label` (or the top).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScriptNotFound`] or
    /// [`EngineError::LabelNotFound`]; nothing is played in that case.
    pub async fn preload_and_play(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> Result<Uuid, EngineError> {
        let script = self.shared.provider.load_script(script_name).await?;
        let line = match label {
            Some(label) => script.line_index_for_label(label)?,
            None => 0,
        };
        Ok(self.play_script(script, line).await)
    }

    /// Plays from exactly `spot`, or from the first command on or after its
    /// line when no command sits at that spot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScriptNotFound`] when the spot's script must
    /// be loaded and cannot be.
    pub async fn resume_at(&self, spot: &PlaybackSpot) -> Result<Uuid, EngineError> {
        let playlist = match self.playlist() {
            Some(playlist) if playlist.script().name() == spot.script_name => playlist,
            _ => {
                let script = self.shared.provider.load_script(&spot.script_name).await?;
                let playlist = self.build_playlist(script);
                self.preload(&playlist).await;
                playlist
            }
        };
        let index = playlist
            .index_of_spot(spot)
            .unwrap_or_else(|| playlist.index_at_or_after_line(spot.line_index));
        Ok(self.play(playlist, index))
    }

    /// Cancels the current play and marks the player stopped. The played
    /// position is kept.
    pub fn stop(&self) {
        let mut state = self.lock();
        if let Some(source) = state.cancel.take() {
            source.cancel();
        }
        state.generation += 1;
        self.shared.status.send_if_modified(|status| {
            if matches!(status, PlayerStatus::Playing | PlayerStatus::WaitingForInput) {
                *status = PlayerStatus::Stopped;
                true
            } else {
                false
            }
        });
        info!(played_index = ?state.played_index, "playback stopped");
    }

    /// Delivers a continue signal. Returns `false` when the player was not
    /// waiting or input processing is disabled.
    pub fn continue_input(&self) -> bool {
        if !self.shared.context.input().is_enabled() {
            debug!("continue ignored: input processing disabled");
            return false;
        }
        self.shared
            .status
            .send_if_modified(|status| swap(status, PlayerStatus::WaitingForInput, PlayerStatus::Playing))
    }

    /// Forces the waiting-for-input flag on or off without a command's
    /// cooperation.
    pub fn set_waiting_for_input_enabled(&self, enabled: bool) {
        let (from, to) = if enabled {
            (PlayerStatus::Playing, PlayerStatus::WaitingForInput)
        } else {
            (PlayerStatus::WaitingForInput, PlayerStatus::Playing)
        };
        self.shared
            .status
            .send_if_modified(|status| swap(status, from, to));
    }

    /// Switches playback mode.
    pub fn set_mode(&self, mode: PlaybackMode) {
        info!(?mode, "playback mode changed");
        self.shared.context.pacing().set_mode(mode);
    }

    /// Picks a pending choice: applies its assignments, then jumps to its
    /// target or continues after the current command.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an unknown choice or a bad
    /// assignment, and navigation errors for a bad target.
    pub async fn select_choice(&self, index: usize) -> Result<(), EngineError> {
        let context = &self.shared.context;
        let option = context.choices().take(index)?;
        info!(summary = %option.summary, spot = %option.spot, "choice selected");

        if let Some(set) = &option.set_expression {
            let expression = context.resolve(&ParameterValue::new(set.clone()))?;
            context.variables().apply(&expression)?;
        }
        if let Some(goto) = &option.goto {
            return self
                .navigate(NavigationRequest::parse(goto, ResetRequest::Default)?)
                .await;
        }

        let playlist = self
            .playlist()
            .ok_or_else(|| EngineError::Validation("nothing is being played".to_owned()))?;
        let next = self.played_index().map_or(0, |index| index + 1);
        self.play(playlist, next);
        Ok(())
    }

    // --- scheduling loop -------------------------------------------------

    fn run(
        self,
        playlist: Arc<Playlist>,
        start_index: usize,
        generation: u64,
        token: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut tails = JoinSet::new();
            let exit = self
                .drive(&playlist, start_index, generation, &token, &mut tails)
                .await;
            while let Some(joined) = tails.join_next().await {
                if let Err(err) = joined {
                    warn!(error = %err, "fire-and-continue command aborted");
                }
            }

            if exit == Exit::Finished && self.transition_if_current(generation, PlayerStatus::Stopped) {
                let script_name = playlist.script().name().to_owned();
                info!(script = %script_name, "playback finished");
                self.shared
                    .observers
                    .notify(&PlayerEvent::Finished { script_name });
            }
        })
    }

    async fn drive(
        &self,
        playlist: &Arc<Playlist>,
        start_index: usize,
        generation: u64,
        token: &CancelToken,
        tails: &mut JoinSet<()>,
    ) -> Exit {
        let mut index = start_index;
        loop {
            if token.is_cancelled() || !self.wait_while_paused(token).await {
                return Exit::Cancelled;
            }
            if self.is_waiting_for_input() && !self.await_input(generation, token).await {
                return Exit::Cancelled;
            }
            let Some(entry) = playlist.get(index) else {
                return Exit::Finished;
            };
            if !self.mark_played(generation, index) {
                return Exit::Cancelled;
            }

            let command = entry.command().clone();
            let spot = command.spot().clone();
            self.shared.hooks.before_dispatch(&spot);
            debug!(spot = %spot, command = command.command_type(), "dispatching command");
            self.shared.observers.notify(&PlayerEvent::CommandStarted {
                spot: spot.clone(),
                command_type: command.command_type(),
            });

            entry.set_state(ExecutionState::Executing);
            let outcome = if command.traits().force_wait {
                let result = self.execute_isolated(&command, token).await;
                if token.is_cancelled() {
                    entry.set_state(ExecutionState::Canceled);
                    return Exit::Cancelled;
                }
                entry.set_state(ExecutionState::Complete);
                result.unwrap_or_else(|err| {
                    self.report_failure(&spot, &err);
                    CommandOutcome::Continue
                })
            } else {
                self.spawn_tail(tails, playlist.clone(), index, token.clone());
                CommandOutcome::Continue
            };

            match outcome {
                CommandOutcome::Continue => index += 1,
                CommandOutcome::WaitForInput => {
                    if !self.enter_waiting(generation, &spot) || !self.await_input(generation, token).await {
                        return Exit::Cancelled;
                    }
                    index += 1;
                }
                CommandOutcome::Stop => {
                    info!(spot = %spot, "stop requested by script");
                    return Exit::Finished;
                }
                CommandOutcome::Navigate(request) => match self.navigate(request).await {
                    Ok(()) => return Exit::Superseded,
                    Err(err) => {
                        self.report_failure(&spot, &err);
                        index += 1;
                    }
                },
                CommandOutcome::Reset(excluded) => {
                    if let Err(err) = self.shared.hooks.reset_state(excluded).await {
                        self.report_failure(&spot, &err);
                    }
                    index += 1;
                }
            }
        }
    }

    /// Runs a forced-wait command on its own task so a panic surfaces as a
    /// command failure instead of ending the loop.
    async fn execute_isolated(
        &self,
        command: &Arc<dyn Command>,
        token: &CancelToken,
    ) -> Result<CommandOutcome, EngineError> {
        let player = self.clone();
        let task_command = command.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            task_command
                .execute(&player.shared.context, &task_token)
                .await
        })
        .await
        .unwrap_or_else(|err| {
            Err(EngineError::CommandExecution {
                spot: command.spot().clone(),
                message: err.to_string(),
            })
        })
    }

    fn spawn_tail(
        &self,
        tails: &mut JoinSet<()>,
        playlist: Arc<Playlist>,
        index: usize,
        token: CancelToken,
    ) {
        let player = self.clone();
        tails.spawn(async move {
            let Some(entry) = playlist.get(index) else {
                return;
            };
            let command = entry.command().clone();
            let result = command.execute(&player.shared.context, &token).await;
            if token.is_cancelled() {
                entry.set_state(ExecutionState::Canceled);
                return;
            }
            entry.set_state(ExecutionState::Complete);
            if let Err(err) = result {
                player.report_failure(command.spot(), &err);
            }
        });
    }

    fn report_failure(&self, spot: &PlaybackSpot, err: &EngineError) {
        error!(spot = %spot, error = %err, "command failed");
        self.shared.observers.notify(&PlayerEvent::CommandFailed {
            spot: spot.clone(),
            message: err.to_string(),
        });
    }

    fn mark_played(&self, generation: u64, index: usize) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.played_index = Some(index);
        true
    }

    fn enter_waiting(&self, generation: u64, spot: &PlaybackSpot) -> bool {
        if !self.transition_if_current(generation, PlayerStatus::WaitingForInput) {
            return false;
        }
        debug!(spot = %spot, "waiting for input");
        self.shared
            .observers
            .notify(&PlayerEvent::WaitingForInput { spot: spot.clone() });
        true
    }

    fn transition_if_current(&self, generation: u64, status: PlayerStatus) -> bool {
        let state = self.lock();
        if state.generation != generation {
            return false;
        }
        self.shared.status.send_replace(status);
        true
    }

    async fn wait_while_paused(&self, token: &CancelToken) -> bool {
        let mut mode = self.shared.context.pacing().subscribe();
        let resumed = async {
            mode.wait_for(|mode| *mode != PlaybackMode::Paused)
                .await
                .is_ok()
        };
        tokio::select! {
            resumed = resumed => resumed,
            () = token.cancelled() => false,
        }
    }

    /// Waits until the status leaves `WaitingForInput`. Skip mode releases
    /// the wait at once; auto-play releases it after the configured delay.
    async fn await_input(&self, generation: u64, token: &CancelToken) -> bool {
        let mut status = self.shared.status.subscribe();
        let mut mode = self.shared.context.pacing().subscribe();
        let auto_play_delay = self.shared.context.pacing().auto_play_delay();
        loop {
            if token.is_cancelled() {
                return false;
            }
            let waiting = *status.borrow_and_update() == PlayerStatus::WaitingForInput;
            if !waiting {
                return true;
            }
            let current_mode = *mode.borrow_and_update();
            if current_mode == PlaybackMode::Skip {
                self.release_wait(generation);
                continue;
            }

            let auto_play = async {
                if current_mode == PlaybackMode::AutoPlay {
                    tokio::time::sleep(auto_play_delay).await;
                } else {
                    std::future::pending::<()>().await;
                }
            };
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                changed = mode.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                () = auto_play => self.release_wait(generation),
                () = token.cancelled() => return false,
            }
        }
    }

    fn release_wait(&self, generation: u64) {
        let state = self.lock();
        if state.generation == generation {
            self.shared
                .status
                .send_if_modified(|status| swap(status, PlayerStatus::WaitingForInput, PlayerStatus::Playing));
        }
    }

    // --- navigation ------------------------------------------------------

    async fn navigate(&self, request: NavigationRequest) -> Result<(), EngineError> {
        let current = self.playlist();
        let target = request
            .script
            .clone()
            .or_else(|| current.as_ref().map(|playlist| playlist.script().name().to_owned()))
            .ok_or_else(|| EngineError::Validation("navigation without a played script".to_owned()))?;

        if let Some(playlist) = current.filter(|playlist| playlist.script().name() == target) {
            let line = match &request.label {
                Some(label) => playlist.script().line_index_for_label(label)?,
                None => 0,
            };
            info!(script = %target, label = ?request.label, "navigating within script");
            let start = playlist.index_at_or_after_line(line);
            self.play(playlist, start);
            return Ok(());
        }

        let script = self.shared.provider.load_script(&target).await?;
        let line = match &request.label {
            Some(label) => script.line_index_for_label(label)?,
            None => 0,
        };
        let reset = match request.reset {
            ResetRequest::Default => self.shared.config.reset_on_goto.then_some(None),
            ResetRequest::All => Some(None),
            ResetRequest::Excluding(ids) => Some(Some(ids)),
            ResetRequest::Skip => None,
        };
        if let Some(excluded) = reset {
            self.shared.hooks.reset_state(excluded).await?;
        }
        info!(script = %target, label = ?request.label, "navigating to script");
        self.play_script(script, line).await;
        Ok(())
    }

    /// Holds resources of `playlist`'s preloadable commands, releasing
    /// whatever the previously preloaded playlist held.
    async fn preload(&self, playlist: &Arc<Playlist>) {
        let context = &self.shared.context;
        let previous = self
            .shared
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(playlist.clone());
        if let Some(previous) = previous {
            for entry in previous.entries() {
                if entry.command().traits().preloadable {
                    entry.command().release_resources(context);
                }
            }
        }
        for entry in playlist.entries() {
            if !entry.command().traits().preloadable {
                continue;
            }
            if let Err(err) = entry.command().hold_resources(context).await {
                warn!(spot = %entry.spot(), error = %err, "resource hold failed");
            }
        }
    }
}

fn swap(status: &mut PlayerStatus, from: PlayerStatus, to: PlayerStatus) -> bool {
    if *status == from {
        *status = to;
        true
    } else {
        false
    }
}
