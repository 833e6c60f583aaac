//! Background tasks observing the external media player.
//!
//! Each task only reads the player and forwards [`ClockSignal`]s to the
//! viewer; none of them touches viewer state directly.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast::error::RecvError, mpsc, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, info};

use crate::{
    media::{MediaPlayer, PlayerNotice},
    state::playback::DurationRetry,
};

/// Observation forwarded from the player tasks to the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockSignal {
    /// Position polled while playing.
    Position(f64),
    /// Notification pushed by the player.
    Notice(PlayerNotice),
    /// Media length once it became known.
    Duration(f64),
}

/// Backoff used while the player cannot report its duration yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBackoff {
    /// Delay after the first failed attempt.
    pub initial: Duration,
    /// Upper bound of the doubling delay.
    pub max: Duration,
    /// Attempt bound.
    pub retry: DurationRetry,
}

/// Aborts the wrapped tasks when dropped.
#[derive(Debug, Default)]
pub struct TaskGuard {
    handles: Vec<JoinHandle<()>>,
}

impl TaskGuard {
    /// Empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` so it is aborted with the guard.
    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Abort every tracked task now.
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Poll the player position every `every` while `playing` is set.
///
/// Native position updates arrive far more often than aggregates need; the
/// interval bounds how often the viewer recomputes.
pub fn spawn_position_poller(
    player: Arc<dyn MediaPlayer>,
    every: Duration,
    mut playing: watch::Receiver<bool>,
    sink: mpsc::UnboundedSender<ClockSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if playing.wait_for(|is_playing| *is_playing).await.is_err() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = playing.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if !*playing.borrow() {
                continue;
            }

            let position = player.current_time().await;
            if sink.send(ClockSignal::Position(position)).is_err() {
                break;
            }
        }

        debug!("position poller stopped");
    })
}

/// Forward player notifications until the player or the viewer goes away.
pub fn spawn_notice_forwarder(
    player: Arc<dyn MediaPlayer>,
    sink: mpsc::UnboundedSender<ClockSignal>,
) -> JoinHandle<()> {
    let mut notices = player.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    if sink.send(ClockSignal::Notice(notice)).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    // Only the latest transport state matters.
                    debug!(skipped, "player notices lagged");
                    continue;
                }
            }
        }
    })
}

/// Ask the player for its duration until it reports a positive value.
///
/// With [`DurationRetry::Unbounded`] this only ends with the calling task.
pub async fn resolve_duration(player: &dyn MediaPlayer, backoff: DurationBackoff) -> f64 {
    let mut delay = backoff.initial;
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        match player.duration().await {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                info!(duration, attempt, "media duration resolved");
                return duration;
            }
            reported => {
                debug!(?reported, attempt, "media duration not available yet");
                match backoff.retry {
                    DurationRetry::Unbounded => {}
                }
                sleep(delay).await;
                delay = (delay * 2).min(backoff.max);
            }
        }
    }
}

/// Run [`resolve_duration`] in the background and forward the result.
pub fn spawn_duration_resolver(
    player: Arc<dyn MediaPlayer>,
    backoff: DurationBackoff,
    sink: mpsc::UnboundedSender<ClockSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let duration = resolve_duration(player.as_ref(), backoff).await;
        let _ = sink.send(ClockSignal::Duration(duration));
    })
}
