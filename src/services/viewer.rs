//! The game viewer: one actor task owning every piece of mutable game state.
//!
//! User commands and clock signals are drained from two queues by a single
//! task, so handlers never interleave. Persistence calls run in spawned
//! tasks and report back through a completion queue; nothing is mirrored
//! into the [`EventLog`] before the store confirmed it.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::{debug, error, info, warn};

use crate::{
    config::AppConfig,
    dao::{
        models::{NewStatEntity, StatEntity},
        stat_store::StatStore,
        storage::StorageResult,
    },
    dto::viewer::{ViewerEvent, ViewerSnapshot},
    error::TrackerError,
    media::{MediaPlayer, PlayerNotice},
    services::{
        game_service,
        playback_service::{
            ClockSignal, DurationBackoff, TaskGuard, spawn_duration_resolver,
            spawn_notice_forwarder, spawn_position_poller,
        },
        scoring::{self, PlayerLine, ScoreAggregate, ScorePoint, ScoreTracker},
    },
    state::{
        access::{DeleteConfirmation, EditCapability},
        editor::{CommitOutcome, CommitTicket, EditorSnapshot, StatEditorSession},
        event_log::EventLog,
        game::{Game, GameId, ParticipantId, Stat, StatId, StatKind, StatPatch},
        hub::EventHub,
        playback::{ClockMove, PlaybackClock},
        roster::{self, RoleMap, Roster, Side},
    },
};

/// Collaborators supplied by the embedding application.
#[derive(Clone)]
pub struct ViewerDeps {
    /// Source of truth for games and stats.
    pub store: Arc<dyn StatStore>,
    /// Media player driving the clock.
    pub player: Arc<dyn MediaPlayer>,
    /// Edit rights of the current user.
    pub capability: Arc<dyn EditCapability>,
    /// Prompt shown before deleting a committed stat.
    pub confirmation: Arc<dyn DeleteConfirmation>,
}

/// Timings and buffer sizes of a viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSettings {
    /// Interval between two position polls while playing.
    pub tick_interval: Duration,
    /// Divergence above which nudging the candidate seeks the clock.
    pub retime_tolerance: f64,
    /// Backoff while the media duration is unknown.
    pub duration_backoff: DurationBackoff,
    /// Capacity of the observer channel.
    pub event_capacity: usize,
}

impl From<&AppConfig> for ViewerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            retime_tolerance: config.retime_tolerance(),
            duration_backoff: config.duration_backoff(),
            event_capacity: config.event_capacity(),
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Outcome of [`GameViewer::delete_committed`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The stat was deleted from the store and the log.
    Deleted(Stat),
    /// The user declined the confirmation; nothing changed.
    Declined,
}

/// Read-only state of a viewed game, lent to [`GameViewer::read`] closures.
#[derive(Debug)]
pub struct GameView {
    game_id: GameId,
    name: String,
    video_url: String,
    log: EventLog,
    home: Roster,
    away: Roster,
    roles: RoleMap,
    clock: PlaybackClock,
}

impl GameView {
    fn new(game: Game) -> Result<Self, TrackerError> {
        let roles = roster::resolve(&game.home, &game.away)?;
        let log = EventLog::from_stats(game.id, game.stats)?;
        Ok(Self {
            game_id: game.id,
            name: game.name,
            video_url: game.video_url,
            log,
            home: game.home,
            away: game.away,
            roles,
            clock: PlaybackClock::new(),
        })
    }

    /// Game identifier.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the game video.
    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    /// Committed stats.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Roster of `side`.
    pub fn roster(&self, side: Side) -> &Roster {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Participant to side mapping.
    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }

    /// Observed player state.
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Score including every stat at or before `cutoff`.
    pub fn score_at(&self, cutoff: f64) -> ScoreAggregate {
        scoring::score_at(&self.log, &self.roles, cutoff)
    }

    /// Score over the whole log.
    pub fn final_score(&self) -> ScoreAggregate {
        scoring::final_score(&self.log, &self.roles)
    }

    /// Per-participant lines of mapped participants.
    pub fn box_score(&self) -> BTreeMap<ParticipantId, PlayerLine> {
        scoring::box_score(&self.log, &self.roles)
    }

    /// Running score after each scoring stat.
    pub fn score_progression(&self) -> Vec<ScorePoint> {
        scoring::score_progression(&self.log, &self.roles)
    }

    /// Stats of one participant in log order.
    pub fn player_timeline(&self, participant: ParticipantId) -> Vec<Stat> {
        scoring::player_timeline(&self.log, participant)
    }
}

type Reply<T> = oneshot::Sender<Result<T, TrackerError>>;
type ReadJob = Box<dyn FnOnce(&GameView) + Send>;

enum Command {
    BeginEdit {
        participant: ParticipantId,
        reply: Reply<EditorSnapshot>,
    },
    SelectKind {
        kind: StatKind,
        reply: Reply<EditorSnapshot>,
    },
    AdjustTime {
        delta: f64,
        reply: Reply<EditorSnapshot>,
    },
    Seek {
        seconds: f64,
        reply: Reply<f64>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Cancel {
        reply: Reply<EditorSnapshot>,
    },
    Commit {
        reply: Reply<CommitTicket>,
    },
    RemoveCommitted {
        id: StatId,
        reply: Reply<Stat>,
    },
    ApplyCorrection {
        stat: Stat,
        reply: Reply<Stat>,
    },
    UpdateRoster {
        side: Side,
        roster: Roster,
        reply: Reply<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<ViewerSnapshot>,
    },
    Read(ReadJob),
    Shutdown,
}

struct CommitCompletion {
    ticket: CommitTicket,
    result: StorageResult<StatEntity>,
}

/// Handle to a running viewer.
///
/// Dropping the handle stops the background tasks; [`close`](Self::close)
/// additionally waits for the actor to finish.
pub struct GameViewer {
    game_id: GameId,
    commands: mpsc::UnboundedSender<Command>,
    hub: Arc<EventHub>,
    store: Arc<dyn StatStore>,
    capability: Arc<dyn EditCapability>,
    confirmation: Arc<dyn DeleteConfirmation>,
    actor: JoinHandle<()>,
    _tasks: TaskGuard,
}

impl GameViewer {
    /// Load `game_id` from the store and start viewing it.
    pub async fn open(
        game_id: GameId,
        deps: ViewerDeps,
        settings: ViewerSettings,
    ) -> Result<Self, TrackerError> {
        let game = game_service::load_game(deps.store.as_ref(), game_id).await?;
        Self::start(game, deps, settings)
    }

    /// Start viewing an already loaded game.
    pub fn start(
        game: Game,
        deps: ViewerDeps,
        settings: ViewerSettings,
    ) -> Result<Self, TrackerError> {
        let view = GameView::new(game)?;
        let game_id = view.game_id;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (clock_tx, clock_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (playing_tx, playing_rx) = watch::channel(false);
        let hub = Arc::new(EventHub::new(settings.event_capacity));

        let mut tasks = TaskGuard::new();
        tasks.push(spawn_notice_forwarder(deps.player.clone(), clock_tx.clone()));
        tasks.push(spawn_position_poller(
            deps.player.clone(),
            settings.tick_interval,
            playing_rx,
            clock_tx.clone(),
        ));
        tasks.push(spawn_duration_resolver(
            deps.player.clone(),
            settings.duration_backoff,
            clock_tx,
        ));

        let actor = ViewerActor {
            session: StatEditorSession::new(game_id, settings.retime_tolerance),
            view,
            tracker: ScoreTracker::new(),
            store: deps.store.clone(),
            player: deps.player.clone(),
            capability: deps.capability.clone(),
            hub: hub.clone(),
            playing: playing_tx,
            completions: completions_tx,
            in_flight: None,
        };
        let actor = tokio::spawn(actor.run(commands_rx, clock_rx, completions_rx));
        info!(%game_id, "viewer started");

        Ok(Self {
            game_id,
            commands: commands_tx,
            hub,
            store: deps.store,
            capability: deps.capability,
            confirmation: deps.confirmation,
            actor,
            _tasks: tasks,
        })
    }

    /// Game being viewed.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Open a candidate for `participant` at the current clock position and
    /// pause the player.
    ///
    /// Without edit rights this is a no-op returning the unchanged session.
    pub async fn begin_edit(&self, participant: ParticipantId) -> Result<EditorSnapshot, TrackerError> {
        self.request(|reply| Command::BeginEdit { participant, reply })
            .await
    }

    /// Choose the kind of the open candidate.
    pub async fn select_kind(&self, kind: StatKind) -> Result<EditorSnapshot, TrackerError> {
        self.request(|reply| Command::SelectKind { kind, reply }).await
    }

    /// Nudge the open candidate by `delta` seconds.
    pub async fn adjust_time(&self, delta: f64) -> Result<EditorSnapshot, TrackerError> {
        self.request(|reply| Command::AdjustTime { delta, reply })
            .await
    }

    /// Move the player to `seconds`; returns the clamped position.
    pub async fn seek(&self, seconds: f64) -> Result<f64, TrackerError> {
        if !seconds.is_finite() {
            return Err(TrackerError::InvalidInput(format!(
                "seek target `{seconds}` is not a finite number"
            )));
        }
        self.request(|reply| Command::Seek { seconds, reply }).await
    }

    /// Resume playback.
    pub async fn play(&self) -> Result<(), TrackerError> {
        self.request(|reply| Command::Play { reply }).await
    }

    /// Pause playback.
    pub async fn pause(&self) -> Result<(), TrackerError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Discard the open candidate.
    pub async fn cancel(&self) -> Result<EditorSnapshot, TrackerError> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// Send the open candidate to the store.
    ///
    /// Returns once the call is issued; the outcome is published as
    /// [`ViewerEvent::StatCommitted`] or [`ViewerEvent::CommitFailed`].
    pub async fn commit(&self) -> Result<CommitTicket, TrackerError> {
        self.request(|reply| Command::Commit { reply }).await
    }

    /// Delete a committed stat after the user confirmed it.
    pub async fn delete_committed(&self, id: StatId) -> Result<DeleteOutcome, TrackerError> {
        self.ensure_may_edit("delete")?;

        let stat = self
            .read(move |view| view.log().get(id).cloned())
            .await?
            .ok_or(TrackerError::NotFound(id))?;

        if !self.confirmation.confirm(&stat).await {
            info!(%id, "stat deletion declined");
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(err) = self.store.delete_stat(id).await {
            warn!(%id, error = %err, "failed to delete stat; keeping it");
            self.hub.broadcast(ViewerEvent::DeleteFailed {
                id,
                message: err.to_string(),
            });
            return Err(err.into());
        }

        self.request(|reply| Command::RemoveCommitted { id, reply })
            .await
            .map(DeleteOutcome::Deleted)
    }

    /// Move a committed stat to `seconds`.
    pub async fn correct_timestamp(&self, id: StatId, seconds: f64) -> Result<Stat, TrackerError> {
        self.ensure_may_edit("correct")?;
        if !seconds.is_finite() {
            return Err(TrackerError::InvalidInput(format!(
                "timestamp `{seconds}` is not a finite number"
            )));
        }

        let known = self.read(move |view| view.log().get(id).is_some()).await?;
        if !known {
            return Err(TrackerError::NotFound(id));
        }

        let stored = self
            .store
            .update_stat(id, StatPatch::timestamp(seconds).into())
            .await
            .inspect_err(|err| warn!(%id, error = %err, "failed to correct stat"))?;

        let stat = Stat::from(stored);
        self.request(|reply| Command::ApplyCorrection { stat, reply })
            .await
    }

    /// Replace the roster of `side`; returns the number of mapped participants.
    pub async fn update_roster(&self, side: Side, roster: Roster) -> Result<usize, TrackerError> {
        self.request(|reply| Command::UpdateRoster {
            side,
            roster,
            reply,
        })
        .await
    }

    /// Current summary of the viewer.
    pub async fn snapshot(&self) -> Result<ViewerSnapshot, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        response.await.map_err(|_| TrackerError::ViewerClosed)
    }

    /// Run `inspect` against the viewer state and return its result.
    pub async fn read<R, F>(&self, inspect: F) -> Result<R, TrackerError>
    where
        F: FnOnce(&GameView) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        self.send(Command::Read(Box::new(move |view| {
            let _ = reply.send(inspect(view));
        })))?;
        response.await.map_err(|_| TrackerError::ViewerClosed)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.hub.subscribe()
    }

    /// Stream of published events; lagged receivers skip what they missed.
    pub fn events(&self) -> impl Stream<Item = ViewerEvent> + Send + 'static {
        BroadcastStream::new(self.hub.subscribe()).filter_map(Result::ok)
    }

    /// Stop the viewer and wait for its task to finish.
    pub async fn close(self) {
        let _ = self.commands.send(Command::Shutdown);
        let game_id = self.game_id;
        if let Err(err) = self.actor.await {
            warn!(%game_id, error = %err, "viewer task ended abnormally");
        }
    }

    fn ensure_may_edit(&self, action: &str) -> Result<(), TrackerError> {
        if self.capability.may_edit() {
            return Ok(());
        }
        warn!(game_id = %self.game_id, action, "edit capability missing");
        Err(TrackerError::CapabilityDenied(format!(
            "{action} requires edit rights"
        )))
    }

    fn send(&self, command: Command) -> Result<(), TrackerError> {
        self.commands
            .send(command)
            .map_err(|_| TrackerError::ViewerClosed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| TrackerError::ViewerClosed)?
    }
}

struct ViewerActor {
    view: GameView,
    session: StatEditorSession,
    tracker: ScoreTracker,
    store: Arc<dyn StatStore>,
    player: Arc<dyn MediaPlayer>,
    capability: Arc<dyn EditCapability>,
    hub: Arc<EventHub>,
    playing: watch::Sender<bool>,
    completions: mpsc::UnboundedSender<CommitCompletion>,
    in_flight: Option<JoinHandle<()>>,
}

impl ViewerActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut clock: mpsc::UnboundedReceiver<ClockSignal>,
        mut completions: mpsc::UnboundedReceiver<CommitCompletion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(signal) = clock.recv() => self.handle_signal(signal).await,
                Some(completion) = completions.recv() => self.handle_completion(completion),
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        info!(game_id = %self.view.game_id, "viewer stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::BeginEdit { participant, reply } => {
                let _ = reply.send(self.begin_edit(participant).await);
            }
            Command::SelectKind { kind, reply } => {
                let result = self
                    .session
                    .select_kind(kind)
                    .map(|()| self.publish_editor())
                    .map_err(TrackerError::from);
                let _ = reply.send(result);
            }
            Command::AdjustTime { delta, reply } => {
                let _ = reply.send(self.adjust_time(delta).await);
            }
            Command::Seek { seconds, reply } => {
                let _ = reply.send(Ok(self.seek(seconds).await));
            }
            Command::Play { reply } => {
                self.player.play().await;
                let _ = reply.send(Ok(()));
            }
            Command::Pause { reply } => {
                self.player.pause().await;
                let _ = reply.send(Ok(()));
            }
            Command::Cancel { reply } => {
                let result = self
                    .session
                    .cancel()
                    .map(|candidate| {
                        debug!(participant = %candidate.participant_id, "candidate discarded");
                        self.publish_editor()
                    })
                    .map_err(TrackerError::from);
                let _ = reply.send(result);
            }
            Command::Commit { reply } => {
                let _ = reply.send(self.commit());
            }
            Command::RemoveCommitted { id, reply } => {
                let result = self.view.log.remove(id).map_err(TrackerError::from);
                if result.is_ok() {
                    self.hub.broadcast(ViewerEvent::StatRemoved { id });
                    self.publish_scores();
                }
                let _ = reply.send(result);
            }
            Command::ApplyCorrection { stat, reply } => {
                let patch = StatPatch {
                    participant_id: Some(stat.participant_id),
                    kind: Some(stat.kind),
                    timestamp: Some(stat.timestamp),
                };
                let result = self
                    .view
                    .log
                    .update(stat.id, &patch)
                    .cloned()
                    .map_err(TrackerError::from);
                if let Ok(corrected) = &result {
                    self.hub.broadcast(ViewerEvent::StatCorrected {
                        stat: corrected.clone(),
                    });
                    self.publish_scores();
                }
                let _ = reply.send(result);
            }
            Command::UpdateRoster {
                side,
                roster,
                reply,
            } => {
                let _ = reply.send(self.update_roster(side, roster));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Read(inspect) => inspect(&self.view),
            Command::Shutdown => {}
        }
    }

    async fn begin_edit(&mut self, participant: ParticipantId) -> Result<EditorSnapshot, TrackerError> {
        if !self.capability.may_edit() {
            debug!(%participant, "edit capability missing; ignoring begin_edit");
            return Ok(self.session.snapshot());
        }
        if self.view.roles.side_of(participant).is_none() {
            return Err(TrackerError::InvalidInput(format!(
                "participant `{participant}` is not on either roster"
            )));
        }

        let now = self.player.current_time().await;
        self.session.begin_edit(participant, now)?;
        self.player.pause().await;
        self.observe_position(now, false);

        Ok(self.publish_editor())
    }

    async fn adjust_time(&mut self, delta: f64) -> Result<EditorSnapshot, TrackerError> {
        if !delta.is_finite() {
            return Err(TrackerError::InvalidInput(format!(
                "time delta `{delta}` is not a finite number"
            )));
        }

        let retime = self.session.adjust_time(delta)?;
        if let Some(target) = retime.seek {
            let landed = self.view.clock.clamp(target);
            debug!(target, landed, "candidate drifted from the clock; seeking");
            self.player.seek_to(landed, false).await;
            self.session.note_clock_position(landed);
            // Not fed back into the candidate.
            self.observe_position(landed, false);
        }

        Ok(self.publish_editor())
    }

    async fn seek(&mut self, seconds: f64) -> f64 {
        let landed = self.view.clock.clamp(seconds);
        self.player.seek_to(landed, self.view.clock.is_playing()).await;
        self.observe_position(landed, true);
        landed
    }

    fn commit(&mut self) -> Result<CommitTicket, TrackerError> {
        let pending = self.session.commit()?;
        let ticket = pending.ticket;
        let store = self.store.clone();
        let completions = self.completions.clone();
        let entity = NewStatEntity::from(&pending.stat);

        self.in_flight = Some(tokio::spawn(async move {
            let result = store.create_stat(entity).await;
            let _ = completions.send(CommitCompletion { ticket, result });
        }));
        self.publish_editor();
        Ok(ticket)
    }

    fn handle_completion(&mut self, completion: CommitCompletion) {
        let CommitCompletion { ticket, result } = completion;
        let outcome = match self.session.complete_commit(ticket, result.map(Stat::from)) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%ticket, error = %err, "ignoring stale commit completion");
                return;
            }
        };
        self.in_flight = None;

        match outcome {
            CommitOutcome::Committed(stat) => match self.view.log.insert(stat.clone()) {
                Ok(()) => {
                    info!(stat_id = %stat.id, kind = ?stat.kind, timestamp = stat.timestamp, "stat committed");
                    self.hub.broadcast(ViewerEvent::StatCommitted { stat });
                    self.publish_scores();
                }
                Err(err) => {
                    error!(stat_id = %stat.id, error = %err, "store returned a stat already in the log");
                    self.hub.broadcast(ViewerEvent::CommitFailed {
                        message: TrackerError::from(err).to_string(),
                    });
                }
            },
            CommitOutcome::Failed { stat, error } => {
                warn!(
                    participant = %stat.participant_id,
                    kind = ?stat.kind,
                    timestamp = stat.timestamp,
                    error = %error,
                    "failed to commit stat; candidate discarded"
                );
                self.hub.broadcast(ViewerEvent::CommitFailed {
                    message: error.to_string(),
                });
            }
        }
        self.publish_editor();
    }

    fn update_roster(&mut self, side: Side, roster: Roster) -> Result<usize, TrackerError> {
        let roles = match side {
            Side::Home => roster::resolve(&roster, &self.view.away)?,
            Side::Away => roster::resolve(&self.view.home, &roster)?,
        };
        match side {
            Side::Home => self.view.home = roster,
            Side::Away => self.view.away = roster,
        }
        self.view.roles = roles;
        self.tracker.invalidate();

        let participants = self.view.roles.len();
        debug!(?side, participants, "roles rebuilt");
        self.hub.broadcast(ViewerEvent::RolesChanged { participants });
        self.publish_scores();
        Ok(participants)
    }

    async fn handle_signal(&mut self, signal: ClockSignal) {
        match signal {
            ClockSignal::Position(seconds) => self.observe_position(seconds, true),
            ClockSignal::Notice(PlayerNotice::Ready) => {
                debug!(game_id = %self.view.game_id, "player ready");
                self.view.clock.mark_ready();
            }
            ClockSignal::Notice(PlayerNotice::StateChanged(state)) => {
                if self.view.clock.observe_state(state) {
                    let is_playing = self.view.clock.is_playing();
                    self.playing.send_replace(is_playing);
                    self.hub
                        .broadcast(ViewerEvent::PlaybackChanged { is_playing });
                }
                let now = self.player.current_time().await;
                self.observe_position(now, true);
            }
            ClockSignal::Duration(duration) => {
                if self.view.clock.resolve_duration(duration) {
                    self.hub.broadcast(ViewerEvent::DurationResolved { duration });
                }
            }
        }
    }

    /// Record a clock position; `follow` lets an open candidate track it.
    fn observe_position(&mut self, seconds: f64, follow: bool) {
        let movement = self.view.clock.observe_position(seconds);
        if movement == ClockMove::Unchanged {
            return;
        }
        if movement == ClockMove::Jumped {
            self.tracker.invalidate();
        }
        if follow && self.session.is_editing() && self.session.live_retime(seconds).is_ok() {
            self.publish_editor();
        }
        self.publish_score();
    }

    fn publish_editor(&self) -> EditorSnapshot {
        let editor = self.session.snapshot();
        self.hub.broadcast(ViewerEvent::EditorChanged {
            editor: editor.clone(),
        });
        editor
    }

    fn publish_score(&mut self) {
        let time = self.view.clock.current_time();
        let score = self.tracker.score_at(&self.view.log, &self.view.roles, time);
        self.hub.broadcast(ViewerEvent::ScoreUpdated { time, score });
    }

    fn publish_scores(&mut self) {
        self.hub.broadcast(ViewerEvent::FinalScoreUpdated {
            score: self.view.final_score(),
        });
        self.publish_score();
    }

    fn snapshot(&mut self) -> ViewerSnapshot {
        let time = self.view.clock.current_time();
        ViewerSnapshot {
            game_id: self.view.game_id,
            time,
            duration: self.view.clock.duration(),
            is_playing: self.view.clock.is_playing(),
            score: self.tracker.score_at(&self.view.log, &self.view.roles, time),
            final_score: self.view.final_score(),
            editor: self.session.snapshot(),
            stats: self.view.log.len(),
        }
    }
}
