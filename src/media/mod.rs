//! Contract of the external media player driving the game clock.

pub mod simulated;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::broadcast;

/// Transport states a player reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Media loaded but never started.
    Unstarted,
    /// Media is playing.
    Playing,
    /// Playback paused by the user or the core.
    Paused,
    /// Waiting for data.
    Buffering,
    /// Reached the end of the media.
    Ended,
}

impl PlayerState {
    /// Only [`PlayerState::Playing`] advances the clock.
    pub fn is_playing(self) -> bool {
        matches!(self, PlayerState::Playing)
    }
}

/// Notifications pushed by the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerNotice {
    /// Media metadata is loaded; the duration should now be obtainable.
    Ready,
    /// Transport state changed.
    StateChanged(PlayerState),
}

/// Capability set of an external media player.
pub trait MediaPlayer: Send + Sync {
    /// Current position in seconds.
    fn current_time(&self) -> BoxFuture<'static, f64>;
    /// Media length in seconds, `None` or `0` while unknown.
    fn duration(&self) -> BoxFuture<'static, Option<f64>>;
    /// Jump to `seconds`, resuming playback afterwards when `resume` is set.
    fn seek_to(&self, seconds: f64, resume: bool) -> BoxFuture<'static, ()>;
    /// Start or resume playback.
    fn play(&self) -> BoxFuture<'static, ()>;
    /// Pause playback.
    fn pause(&self) -> BoxFuture<'static, ()>;
    /// Subscribe to transport notifications.
    fn subscribe(&self) -> broadcast::Receiver<PlayerNotice>;
}
