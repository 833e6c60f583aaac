//! Replay binary: plays a recorded game through a simulated player and
//! reports how the score evolved.

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use serde_json::json;
use tokio_stream::{Stream, StreamExt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use replay_stats::{
    config::AppConfig,
    dao::stat_store::memory::MemoryStatStore,
    dto::viewer::ViewerEvent,
    media::simulated::SimulatedPlayer,
    services::{
        game_service,
        viewer::{GameViewer, ViewerDeps, ViewerSettings},
    },
    state::access::{AutoConfirm, CapabilityFlag},
};

/// Environment variable naming the game export when no argument is given.
const GAME_PATH_ENV: &str = "REPLAY_STATS_GAME_PATH";
/// Seconds of video played past the last recorded stat.
const TAIL_SECS: f64 = 5.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let path = env::args_os()
        .nth(1)
        .or_else(|| env::var_os(GAME_PATH_ENV))
        .map(PathBuf::from)
        .context("usage: replay-stats <games.json> (or set REPLAY_STATS_GAME_PATH)")?;

    let store = MemoryStatStore::from_json_file(&path)
        .with_context(|| format!("seeding store from `{}`", path.display()))?;
    let game_id = store
        .game_ids()
        .into_iter()
        .next()
        .context("seed file holds no game")?;
    let game = game_service::load_game(&store, game_id)
        .await
        .context("loading game")?;

    let length = game
        .stats
        .iter()
        .map(|stat| stat.timestamp)
        .fold(0.0, f64::max)
        + TAIL_SECS;
    info!(%game_id, name = %game.name, length, "replaying game");

    let deps = ViewerDeps {
        store: Arc::new(store),
        player: Arc::new(SimulatedPlayer::load(length, Duration::ZERO)),
        capability: Arc::new(CapabilityFlag::new(false)),
        confirmation: Arc::new(AutoConfirm(false)),
    };
    let viewer = GameViewer::start(game, deps, ViewerSettings::from(&config))
        .context("starting viewer")?;

    let events = viewer.events();
    viewer.play().await.context("starting playback")?;

    tokio::select! {
        _ = follow_scores(events) => info!("replay finished"),
        _ = shutdown_signal() => info!("shutdown requested; stopping replay"),
    }

    let (final_score, box_score) = viewer
        .read(|view| (view.final_score(), view.box_score()))
        .await
        .context("reading final aggregates")?;
    viewer.close().await;

    let report = json!({
        "game_id": game_id,
        "final_score": final_score,
        "box_score": box_score,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Log every score change until playback stops.
async fn follow_scores(events: impl Stream<Item = ViewerEvent>) {
    tokio::pin!(events);
    let mut last = None;

    while let Some(event) = events.next().await {
        match event {
            ViewerEvent::ScoreUpdated { time, score } if last != Some(score) => {
                info!(time, home = score.home, away = score.away, "score changed");
                last = Some(score);
            }
            ViewerEvent::PlaybackChanged { is_playing: false } => break,
            _ => {}
        }
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,replay_stats=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
