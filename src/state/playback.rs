use serde::Serialize;

use crate::media::PlayerState;

/// How a reported position relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMove {
    /// Same position as before.
    Unchanged,
    /// Position moved forward.
    Advanced,
    /// Position moved backward; aggregates computed at the old cutoff are stale.
    Jumped,
}

/// Bounds applied to retry attempts while waiting for the media duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationRetry {
    /// Keep retrying for as long as the viewer lives.
    #[default]
    Unbounded,
}

/// Observed state of the external player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackClock {
    current_time: f64,
    duration: Option<f64>,
    state: PlayerState,
    reporting: bool,
    ready: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            state: PlayerState::Unstarted,
            reporting: false,
            ready: false,
        }
    }
}

impl PlaybackClock {
    /// Clock positioned at zero with an unknown duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed position in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Media length, once the player reported a positive value.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Derived from the last transport transition, not from ticks.
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Last transport state reported by the player.
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether at least one position was observed.
    pub fn has_started(&self) -> bool {
        self.reporting
    }

    /// Whether the player announced its media is loaded.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Record that the player is ready.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Record a transport transition, returning whether `is_playing` flipped.
    pub fn observe_state(&mut self, state: PlayerState) -> bool {
        let was_playing = self.is_playing();
        self.state = state;
        was_playing != self.is_playing()
    }

    /// Record a position and classify the move.
    pub fn observe_position(&mut self, seconds: f64) -> ClockMove {
        let seconds = seconds + 0.0;
        let previous = self.current_time;
        let started = self.reporting;
        self.current_time = seconds;
        self.reporting = true;

        if !started {
            return ClockMove::Jumped;
        }
        match seconds.total_cmp(&previous) {
            std::cmp::Ordering::Equal => ClockMove::Unchanged,
            std::cmp::Ordering::Greater => ClockMove::Advanced,
            std::cmp::Ordering::Less => ClockMove::Jumped,
        }
    }

    /// Accept a reported duration when it is positive.
    pub fn resolve_duration(&mut self, seconds: f64) -> bool {
        if seconds.is_finite() && seconds > 0.0 {
            self.duration = Some(seconds);
            true
        } else {
            false
        }
    }

    /// Clamp a seek target to `[0, duration]`; unknown durations pass through.
    pub fn clamp(&self, seconds: f64) -> f64 {
        match self.duration {
            Some(duration) => seconds.clamp(0.0, duration) + 0.0,
            None => seconds + 0.0,
        }
    }
}
