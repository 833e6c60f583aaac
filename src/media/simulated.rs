//! Player driven by the tokio clock, used by the replay binary and tests.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::{Mutex, broadcast},
    time::{Instant, sleep},
};
use tracing::debug;

use crate::media::{MediaPlayer, PlayerNotice, PlayerState};

const NOTICE_CAPACITY: usize = 16;

#[derive(Debug)]
struct Transport {
    /// Position when the player last started or stopped.
    anchor: f64,
    /// Set while playing.
    since: Option<Instant>,
    state: PlayerState,
}

struct Shared {
    transport: Mutex<Transport>,
    notices: broadcast::Sender<PlayerNotice>,
    length: f64,
    loaded_at: Instant,
    load_delay: Duration,
}

impl Shared {
    fn position(&self, transport: &Transport) -> f64 {
        match transport.since {
            Some(start) => (transport.anchor + start.elapsed().as_secs_f64()).min(self.length),
            None => transport.anchor,
        }
    }

    fn transition(&self, transport: &mut Transport, state: PlayerState) {
        if transport.state != state {
            transport.state = state;
            let _ = self.notices.send(PlayerNotice::StateChanged(state));
        }
    }

    /// Flip to `Ended` once the position reached the media length.
    fn settle(&self, transport: &mut Transport) -> f64 {
        let position = self.position(transport);
        if transport.since.is_some() && position >= self.length {
            transport.anchor = self.length;
            transport.since = None;
            self.transition(transport, PlayerState::Ended);
        }
        position
    }
}

/// In-process [`MediaPlayer`] whose position follows [`tokio::time`].
///
/// The duration stays unknown until `load_delay` has elapsed, mimicking a
/// player still fetching metadata; [`PlayerNotice::Ready`] is sent at that
/// point.
#[derive(Clone)]
pub struct SimulatedPlayer {
    shared: Arc<Shared>,
}

impl SimulatedPlayer {
    /// Player for media of `length` seconds. Must be called inside a runtime.
    pub fn load(length: f64, load_delay: Duration) -> Self {
        let (notices, _receiver) = broadcast::channel(NOTICE_CAPACITY);
        let shared = Arc::new(Shared {
            transport: Mutex::new(Transport {
                anchor: 0.0,
                since: None,
                state: PlayerState::Unstarted,
            }),
            notices,
            length,
            loaded_at: Instant::now(),
            load_delay,
        });

        let ready = Arc::downgrade(&shared);
        tokio::spawn(async move {
            sleep(load_delay).await;
            if let Some(shared) = ready.upgrade() {
                debug!(length = shared.length, "simulated media loaded");
                let _ = shared.notices.send(PlayerNotice::Ready);
            }
        });

        Self { shared }
    }

    /// Current transport state.
    pub async fn state(&self) -> PlayerState {
        self.shared.transport.lock().await.state
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn current_time(&self) -> BoxFuture<'static, f64> {
        let shared = self.shared.clone();
        Box::pin(async move {
            let mut transport = shared.transport.lock().await;
            shared.settle(&mut transport)
        })
    }

    fn duration(&self) -> BoxFuture<'static, Option<f64>> {
        let shared = self.shared.clone();
        Box::pin(async move {
            (shared.loaded_at.elapsed() >= shared.load_delay).then_some(shared.length)
        })
    }

    fn seek_to(&self, seconds: f64, resume: bool) -> BoxFuture<'static, ()> {
        let shared = self.shared.clone();
        Box::pin(async move {
            let mut transport = shared.transport.lock().await;
            let playing = resume || transport.since.is_some();
            transport.anchor = seconds.clamp(0.0, shared.length);
            transport.since = playing.then(Instant::now);
            if playing {
                shared.transition(&mut transport, PlayerState::Playing);
            }
        })
    }

    fn play(&self) -> BoxFuture<'static, ()> {
        let shared = self.shared.clone();
        Box::pin(async move {
            let mut transport = shared.transport.lock().await;
            if transport.since.is_none() {
                transport.since = Some(Instant::now());
                shared.transition(&mut transport, PlayerState::Playing);
            }
        })
    }

    fn pause(&self) -> BoxFuture<'static, ()> {
        let shared = self.shared.clone();
        Box::pin(async move {
            let mut transport = shared.transport.lock().await;
            if transport.since.is_some() {
                transport.anchor = shared.position(&transport);
                transport.since = None;
                shared.transition(&mut transport, PlayerState::Paused);
            }
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerNotice> {
        self.shared.notices.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn position_follows_the_clock_while_playing() {
        let player = SimulatedPlayer::load(60.0, Duration::ZERO);
        player.play().await;

        sleep(Duration::from_secs(10)).await;
        player.pause().await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(player.current_time().await, 10.0);
        assert_eq!(player.state().await, PlayerState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_is_unknown_until_loaded() {
        let player = SimulatedPlayer::load(60.0, Duration::from_secs(3));
        let mut notices = player.subscribe();

        assert_eq!(player.duration().await, None);
        assert_eq!(notices.recv().await.unwrap(), PlayerNotice::Ready);
        assert_eq!(player.duration().await, Some(60.0));
    }

    #[tokio::test(start_paused = true)]
    async fn playback_ends_at_the_media_length() {
        let player = SimulatedPlayer::load(5.0, Duration::ZERO);
        let mut notices = player.subscribe();
        player.seek_to(3.0, true).await;

        sleep(Duration::from_secs(4)).await;

        assert_eq!(player.current_time().await, 5.0);
        assert_eq!(player.state().await, PlayerState::Ended);
        let mut seen = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            seen.push(notice);
        }
        assert!(seen.contains(&PlayerNotice::StateChanged(PlayerState::Ended)));
    }

    #[tokio::test(start_paused = true)]
    async fn seeks_are_clamped_to_the_media() {
        let player = SimulatedPlayer::load(30.0, Duration::ZERO);

        player.seek_to(-4.0, false).await;
        assert_eq!(player.current_time().await, 0.0);
        player.seek_to(99.0, false).await;
        assert_eq!(player.current_time().await, 30.0);
        assert_eq!(player.state().await, PlayerState::Unstarted);
    }
}
