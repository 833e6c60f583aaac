#![cfg(feature = "memory-store")]

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::{
        Notify,
        broadcast::{self, error::RecvError},
    },
    time::{sleep, timeout},
};
use tokio_stream::StreamExt;
use uuid::Uuid;

use replay_stats::{
    dao::{
        models::{GameEntity, NewStatEntity, RosterEntity, StatEntity, StatPatchEntity},
        stat_store::{StatStore, memory::MemoryStatStore},
        storage::StorageResult,
    },
    dto::viewer::ViewerEvent,
    error::TrackerError,
    media::{MediaPlayer, simulated::SimulatedPlayer},
    services::{
        scoring::ScoreAggregate,
        viewer::{DeleteOutcome, GameViewer, ViewerDeps, ViewerSettings},
    },
    state::{
        access::{AutoConfirm, CapabilityFlag},
        editor::EditorSnapshot,
        game::StatKind,
        roster::{Roster, Side},
    },
};

const MEDIA_SECS: f64 = 120.0;

struct Fixture {
    viewer: GameViewer,
    events: broadcast::Receiver<ViewerEvent>,
    store: MemoryStatStore,
    player: SimulatedPlayer,
    capability: Arc<CapabilityFlag>,
    game_id: Uuid,
    home: [Uuid; 4],
    away: [Uuid; 4],
}

struct Setup {
    stats: Vec<(usize, StatKind, f64)>,
    may_edit: bool,
    confirm: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            stats: Vec::new(),
            may_edit: true,
            confirm: true,
        }
    }
}

fn roster(name: &str, ids: &[Uuid; 4]) -> RosterEntity {
    RosterEntity {
        id: Uuid::new_v4(),
        name: name.into(),
        slots: ids.iter().copied().map(Some).collect(),
    }
}

fn participants() -> [Uuid; 4] {
    [(); 4].map(|_| Uuid::new_v4())
}

fn game_entity(id: Uuid, home: &[Uuid; 4], away: &[Uuid; 4], stats: Vec<StatEntity>) -> GameEntity {
    GameEntity {
        id,
        name: "league final".into(),
        home: roster("home", home),
        away: roster("away", away),
        video_url: "https://video.invalid/final.mp4".into(),
        stats,
    }
}

fn deps(store: impl StatStore + 'static, player: SimulatedPlayer) -> ViewerDeps {
    ViewerDeps {
        store: Arc::new(store),
        player: Arc::new(player),
        capability: Arc::new(CapabilityFlag::new(true)),
        confirmation: Arc::new(AutoConfirm(true)),
    }
}

/// Store whose stat creation waits until `gate` is notified.
#[derive(Clone)]
struct GatedStore {
    inner: MemoryStatStore,
    gate: Arc<Notify>,
}

impl StatStore for GatedStore {
    fn create_stat(&self, stat: NewStatEntity) -> BoxFuture<'static, StorageResult<StatEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.gate.notified().await;
            store.inner.create_stat(stat).await
        })
    }

    fn update_stat(
        &self,
        id: Uuid,
        patch: StatPatchEntity,
    ) -> BoxFuture<'static, StorageResult<StatEntity>> {
        self.inner.update_stat(id, patch)
    }

    fn delete_stat(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete_stat(id)
    }

    fn find_game(
        &self,
        id: Uuid,
        with_related: bool,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        self.inner.find_game(id, with_related)
    }
}

/// Participants are numbered 0..4 for home and 4..8 for away.
async fn open(setup: Setup) -> Fixture {
    let home = participants();
    let away = participants();
    let everyone: Vec<Uuid> = home.iter().chain(away.iter()).copied().collect();
    let game_id = Uuid::new_v4();

    let stats = setup
        .stats
        .iter()
        .map(|&(who, kind, timestamp)| StatEntity {
            id: Uuid::new_v4(),
            game_id,
            participant_id: everyone[who],
            kind,
            timestamp,
        })
        .collect();
    let store = MemoryStatStore::with_games([game_entity(game_id, &home, &away, stats)]);

    let player = SimulatedPlayer::load(MEDIA_SECS, Duration::ZERO);
    let capability = Arc::new(CapabilityFlag::new(setup.may_edit));
    let deps = ViewerDeps {
        store: Arc::new(store.clone()),
        player: Arc::new(player.clone()),
        capability: capability.clone(),
        confirmation: Arc::new(AutoConfirm(setup.confirm)),
    };

    let viewer = GameViewer::open(game_id, deps, ViewerSettings::default())
        .await
        .unwrap();
    let mut events = viewer.subscribe();
    wait_for(&mut events, |event| {
        matches!(event, ViewerEvent::DurationResolved { .. })
    })
    .await;

    Fixture {
        viewer,
        events,
        store,
        player,
        capability,
        game_id,
        home,
        away,
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<ViewerEvent>,
    mut accept: impl FnMut(&ViewerEvent) -> bool,
) -> ViewerEvent {
    let found = timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await {
                Ok(event) if accept(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("viewer closed while waiting"),
            }
        }
    })
    .await;
    found.expect("event was not published in time")
}

fn candidate_timestamp(editor: &EditorSnapshot) -> f64 {
    match editor {
        EditorSnapshot::Editing { candidate } => candidate.timestamp,
        other => panic!("unexpected editor state {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn nudging_past_the_tolerance_seeks_the_clock_once() {
    let fx = open(Setup::default()).await;
    fx.viewer.seek(45.0).await.unwrap();

    let editor = fx.viewer.begin_edit(fx.home[0]).await.unwrap();
    assert_eq!(candidate_timestamp(&editor), 45.0);

    let editor = fx.viewer.adjust_time(-10.0).await.unwrap();
    assert_eq!(candidate_timestamp(&editor), 35.0);
    assert_eq!(fx.player.current_time().await, 35.0);

    let editor = fx.viewer.adjust_time(2.0).await.unwrap();
    assert_eq!(candidate_timestamp(&editor), 37.0);
    assert_eq!(fx.player.current_time().await, 35.0);

    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.time, 35.0);
    assert_eq!(candidate_timestamp(&snapshot.editor), 37.0);
}

#[tokio::test(start_paused = true)]
async fn nudges_below_zero_are_kept_but_the_seek_is_clamped() {
    let fx = open(Setup::default()).await;
    fx.viewer.seek(1.0).await.unwrap();
    fx.viewer.begin_edit(fx.away[1]).await.unwrap();

    let editor = fx.viewer.adjust_time(-4.0).await.unwrap();

    assert_eq!(candidate_timestamp(&editor), -3.0);
    assert_eq!(fx.player.current_time().await, 0.0);
}

#[tokio::test(start_paused = true)]
async fn committed_stat_enters_the_log_after_the_store_accepts_it() {
    let mut fx = open(Setup::default()).await;
    fx.viewer.seek(42.0).await.unwrap();
    fx.viewer.begin_edit(fx.home[2]).await.unwrap();
    fx.viewer.select_kind(StatKind::TwoPointMade).await.unwrap();

    fx.viewer.commit().await.unwrap();
    let committed = wait_for(&mut fx.events, |event| {
        matches!(event, ViewerEvent::StatCommitted { .. })
    })
    .await;

    let ViewerEvent::StatCommitted { stat } = committed else {
        panic!("unexpected event {committed:?}");
    };
    assert_ne!(stat.id, Uuid::nil());
    assert_eq!(stat.game_id, fx.game_id);
    assert_eq!(stat.participant_id, fx.home[2]);
    assert_eq!(stat.kind, StatKind::TwoPointMade);
    assert_eq!(stat.timestamp, 42.0);

    let id = stat.id;
    let stored = fx
        .viewer
        .read(move |view| view.log().get(id).cloned())
        .await
        .unwrap();
    assert_eq!(stored, Some(stat));
    assert_eq!(fx.store.stat_count(), 1);

    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.editor, EditorSnapshot::Idle);
    assert_eq!(snapshot.final_score, ScoreAggregate { home: 2, away: 0 });
    assert_eq!(snapshot.score, ScoreAggregate { home: 2, away: 0 });
}

#[tokio::test(start_paused = true)]
async fn failed_commit_discards_the_candidate_and_keeps_the_log() {
    let mut fx = open(Setup::default()).await;
    fx.store.set_offline(true);
    fx.viewer.begin_edit(fx.away[0]).await.unwrap();
    fx.viewer.select_kind(StatKind::OnePointMade).await.unwrap();

    fx.viewer.commit().await.unwrap();
    wait_for(&mut fx.events, |event| {
        matches!(event, ViewerEvent::CommitFailed { .. })
    })
    .await;

    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.editor, EditorSnapshot::Idle);
    assert_eq!(snapshot.stats, 0);
    assert_eq!(snapshot.final_score, ScoreAggregate::default());
    assert_eq!(fx.store.stat_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn commit_without_a_kind_keeps_editing() {
    let fx = open(Setup::default()).await;
    fx.viewer.begin_edit(fx.home[0]).await.unwrap();

    let err = fx.viewer.commit().await.unwrap_err();

    assert!(matches!(err, TrackerError::InvalidInput(_)));
    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert!(matches!(snapshot.editor, EditorSnapshot::Editing { .. }));
}

#[tokio::test(start_paused = true)]
async fn only_one_candidate_at_a_time() {
    let fx = open(Setup::default()).await;
    fx.viewer.begin_edit(fx.home[0]).await.unwrap();

    let err = fx.viewer.begin_edit(fx.home[1]).await.unwrap_err();

    assert!(matches!(err, TrackerError::InvalidState(_)));
    fx.viewer.cancel().await.unwrap();
    fx.viewer.begin_edit(fx.home[1]).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unmapped_participant_cannot_be_edited() {
    let fx = open(Setup::default()).await;

    let err = fx.viewer.begin_edit(Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, TrackerError::InvalidInput(_)));
}

#[tokio::test(start_paused = true)]
async fn begin_edit_without_rights_is_ignored() {
    let fx = open(Setup {
        may_edit: false,
        ..Setup::default()
    })
    .await;

    let editor = fx.viewer.begin_edit(fx.home[0]).await.unwrap();

    assert_eq!(editor, EditorSnapshot::Idle);
    fx.capability.set(true);
    let editor = fx.viewer.begin_edit(fx.home[0]).await.unwrap();
    assert!(matches!(editor, EditorSnapshot::Editing { .. }));
}

#[tokio::test(start_paused = true)]
async fn deletion_requires_rights_and_confirmation() {
    let fx = open(Setup {
        stats: vec![(0, StatKind::TwoPointMade, 10.0)],
        may_edit: false,
        confirm: false,
    })
    .await;
    let id = fx
        .viewer
        .read(|view| view.log().all_events().next().map(|stat| stat.id))
        .await
        .unwrap()
        .unwrap();

    let err = fx.viewer.delete_committed(id).await.unwrap_err();
    assert!(matches!(err, TrackerError::CapabilityDenied(_)));

    fx.capability.set(true);
    let outcome = fx.viewer.delete_committed(id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(fx.store.stat_count(), 1);
    assert_eq!(fx.viewer.snapshot().await.unwrap().stats, 1);
}

#[tokio::test(start_paused = true)]
async fn confirmed_deletion_removes_the_stat() {
    let mut fx = open(Setup {
        stats: vec![
            (0, StatKind::TwoPointMade, 10.0),
            (5, StatKind::OnePointMade, 12.0),
        ],
        ..Setup::default()
    })
    .await;
    let id = fx
        .viewer
        .read(|view| view.log().all_events().next().map(|stat| stat.id))
        .await
        .unwrap()
        .unwrap();

    let outcome = fx.viewer.delete_committed(id).await.unwrap();

    assert!(matches!(outcome, DeleteOutcome::Deleted(stat) if stat.id == id));
    wait_for(&mut fx.events, |event| {
        matches!(event, ViewerEvent::StatRemoved { id: removed } if *removed == id)
    })
    .await;
    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.stats, 1);
    assert_eq!(snapshot.final_score, ScoreAggregate { home: 0, away: 1 });
    assert_eq!(fx.store.stat_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_deletion_keeps_the_stat() {
    let mut fx = open(Setup {
        stats: vec![(1, StatKind::Steal, 3.0)],
        ..Setup::default()
    })
    .await;
    let id = fx
        .viewer
        .read(|view| view.log().all_events().next().map(|stat| stat.id))
        .await
        .unwrap()
        .unwrap();
    fx.store.set_offline(true);

    let err = fx.viewer.delete_committed(id).await.unwrap_err();

    assert!(matches!(err, TrackerError::PersistenceFailure(_)));
    wait_for(&mut fx.events, |event| {
        matches!(event, ViewerEvent::DeleteFailed { .. })
    })
    .await;
    let still_there = fx
        .viewer
        .read(move |view| view.log().get(id).is_some())
        .await
        .unwrap();
    assert!(still_there);
}

#[tokio::test(start_paused = true)]
async fn corrected_timestamp_moves_the_stat_in_the_timeline() {
    let fx = open(Setup {
        stats: vec![(4, StatKind::TwoPointMade, 50.0)],
        ..Setup::default()
    })
    .await;
    let id = fx
        .viewer
        .read(|view| view.log().all_events().next().map(|stat| stat.id))
        .await
        .unwrap()
        .unwrap();

    let corrected = fx.viewer.correct_timestamp(id, 8.0).await.unwrap();

    assert_eq!(corrected.timestamp, 8.0);
    let score = fx.viewer.read(|view| view.score_at(10.0)).await.unwrap();
    assert_eq!(score, ScoreAggregate { home: 0, away: 2 });

    fx.capability.set(false);
    let err = fx.viewer.correct_timestamp(id, 9.0).await.unwrap_err();
    assert!(matches!(err, TrackerError::CapabilityDenied(_)));
}

#[tokio::test(start_paused = true)]
async fn roster_changes_rebuild_the_roles() {
    let fx = open(Setup {
        stats: vec![
            (0, StatKind::TwoPointMade, 5.0),
            (1, StatKind::TwoPointMade, 6.0),
        ],
        ..Setup::default()
    })
    .await;

    let conflicting = Roster::from_slots([Some(fx.away[0]), None, None, None]).unwrap();
    let err = fx
        .viewer
        .update_roster(Side::Home, conflicting)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::RosterConflict(id) if id == fx.away[0]));
    assert_eq!(fx.viewer.read(|view| view.roles().len()).await.unwrap(), 8);

    let benched = Roster::from_slots([Some(fx.home[0]), None, Some(fx.home[2]), Some(fx.home[3])])
        .unwrap();
    let mapped = fx.viewer.update_roster(Side::Home, benched).await.unwrap();

    assert_eq!(mapped, 7);
    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(snapshot.final_score, ScoreAggregate { home: 2, away: 0 });
}

#[tokio::test(start_paused = true)]
async fn seeks_are_clamped_to_the_media_length() {
    let fx = open(Setup::default()).await;

    assert_eq!(fx.viewer.seek(500.0).await.unwrap(), MEDIA_SECS);
    assert_eq!(fx.viewer.seek(-3.0).await.unwrap(), 0.0);
    assert!(matches!(
        fx.viewer.seek(f64::NAN).await,
        Err(TrackerError::InvalidInput(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn playback_publishes_the_running_score() {
    let fx = open(Setup {
        stats: vec![
            (0, StatKind::TwoPointMade, 5.0),
            (6, StatKind::OnePointMade, 15.0),
            (6, StatKind::TwoPointMade, 90.0),
        ],
        ..Setup::default()
    })
    .await;
    let mut events = Box::pin(fx.viewer.events());

    fx.viewer.play().await.unwrap();
    sleep(Duration::from_secs(20)).await;
    fx.viewer.pause().await.unwrap();

    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert!(snapshot.time > 15.0 && snapshot.time < 90.0);
    assert_eq!(snapshot.score, ScoreAggregate { home: 2, away: 1 });
    assert_eq!(snapshot.final_score, ScoreAggregate { home: 2, away: 3 });

    let mut saw_pause = false;
    while let Ok(Some(event)) = timeout(Duration::from_millis(10), events.next()).await {
        if event == (ViewerEvent::PlaybackChanged { is_playing: false }) {
            saw_pause = true;
        }
    }
    assert!(saw_pause);
}

#[tokio::test(start_paused = true)]
async fn open_candidate_follows_the_playing_clock() {
    let fx = open(Setup::default()).await;
    fx.viewer.begin_edit(fx.home[3]).await.unwrap();

    fx.viewer.play().await.unwrap();
    sleep(Duration::from_secs(3)).await;
    fx.viewer.pause().await.unwrap();

    let snapshot = fx.viewer.snapshot().await.unwrap();
    let timestamp = candidate_timestamp(&snapshot.editor);
    assert!(timestamp > 2.0);
    assert_eq!(timestamp, snapshot.time);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_viewer_closes_the_event_stream() {
    let fx = open(Setup::default()).await;
    let mut events = fx.viewer.subscribe();

    drop(fx.viewer);

    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Err(RecvError::Closed) => break,
                _ => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test(start_paused = true)]
async fn closed_viewer_stops_its_tasks() {
    let fx = open(Setup::default()).await;
    let mut events = fx.viewer.subscribe();

    fx.viewer.close().await;

    loop {
        match events.recv().await {
            Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(_)) | Ok(_) => continue,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn closing_during_a_commit_drops_the_pending_write() {
    let (home, away) = (participants(), participants());
    let game_id = Uuid::new_v4();
    let memory = MemoryStatStore::with_games([game_entity(game_id, &home, &away, Vec::new())]);
    let gate = Arc::new(Notify::new());
    let store = GatedStore {
        inner: memory.clone(),
        gate: gate.clone(),
    };
    let player = SimulatedPlayer::load(MEDIA_SECS, Duration::ZERO);
    let viewer = GameViewer::open(game_id, deps(store, player), ViewerSettings::default())
        .await
        .unwrap();
    let mut events = viewer.subscribe();

    viewer.begin_edit(home[0]).await.unwrap();
    viewer.select_kind(StatKind::Steal).await.unwrap();
    viewer.commit().await.unwrap();
    sleep(Duration::from_millis(10)).await;
    viewer.close().await;
    gate.notify_one();
    sleep(Duration::from_millis(10)).await;

    let mut published = Vec::new();
    loop {
        match events.recv().await {
            Ok(event) => published.push(event),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    assert!(
        !published
            .iter()
            .any(|event| matches!(event, ViewerEvent::StatCommitted { .. }))
    );
    assert_eq!(memory.stat_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scrubbing_while_paused_moves_the_candidate_with_the_clock() {
    let fx = open(Setup::default()).await;
    let editor = fx.viewer.begin_edit(fx.home[1]).await.unwrap();
    assert_eq!(candidate_timestamp(&editor), 0.0);

    assert_eq!(fx.viewer.seek(20.0).await.unwrap(), 20.0);

    let snapshot = fx.viewer.snapshot().await.unwrap();
    assert_eq!(candidate_timestamp(&snapshot.editor), 20.0);
    assert_eq!(snapshot.time, 20.0);
    assert_eq!(fx.player.current_time().await, 20.0);

    let editor = fx.viewer.adjust_time(0.5).await.unwrap();
    assert_eq!(candidate_timestamp(&editor), 20.5);
    assert_eq!(fx.player.current_time().await, 20.0);
}

#[tokio::test(start_paused = true)]
async fn view_exposes_the_game_and_player_readiness() {
    let (home, away) = (participants(), participants());
    let game_id = Uuid::new_v4();
    let store = MemoryStatStore::with_games([game_entity(game_id, &home, &away, Vec::new())]);
    let player = SimulatedPlayer::load(MEDIA_SECS, Duration::from_secs(2));
    let viewer = GameViewer::open(game_id, deps(store, player), ViewerSettings::default())
        .await
        .unwrap();
    let mut events = viewer.subscribe();

    let (name, video_url, home_slots, away_ids, ready, duration) = viewer
        .read(|view| {
            (
                view.name().to_owned(),
                view.video_url().to_owned(),
                *view.roster(Side::Home).slots(),
                view.roster(Side::Away).participants().collect::<Vec<_>>(),
                view.clock().is_ready(),
                view.clock().duration(),
            )
        })
        .await
        .unwrap();
    assert_eq!(name, "league final");
    assert_eq!(video_url, "https://video.invalid/final.mp4");
    assert_eq!(home_slots, home.map(Some));
    assert_eq!(away_ids, away.to_vec());
    assert!(!ready);
    assert_eq!(duration, None);

    wait_for(&mut events, |event| {
        matches!(event, ViewerEvent::DurationResolved { .. })
    })
    .await;
    let became_ready = timeout(Duration::from_secs(5), async {
        while !viewer.read(|view| view.clock().is_ready()).await.unwrap() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(became_ready.is_ok());
    let duration = viewer.read(|view| view.clock().duration()).await.unwrap();
    assert_eq!(duration, Some(MEDIA_SECS));
}

#[tokio::test(start_paused = true)]
async fn conflicting_rosters_fail_to_open() {
    let shared = Uuid::new_v4();
    let mut home = participants();
    let mut away = participants();
    home[0] = shared;
    away[1] = shared;
    let game_id = Uuid::new_v4();
    let store = MemoryStatStore::with_games([game_entity(game_id, &home, &away, Vec::new())]);
    let player = SimulatedPlayer::load(MEDIA_SECS, Duration::ZERO);

    let err = GameViewer::open(game_id, deps(store, player), ViewerSettings::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, TrackerError::RosterConflict(id) if id == shared));
}
