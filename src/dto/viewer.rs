use serde::Serialize;

use crate::{
    services::scoring::ScoreAggregate,
    state::{
        editor::EditorSnapshot,
        game::{GameId, Stat, StatId},
    },
};

/// Notification published to everything observing a game viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// Score at the current clock position.
    ScoreUpdated {
        /// Clock position the score was computed at.
        time: f64,
        /// Score including every stat at or before `time`.
        score: ScoreAggregate,
    },
    /// Score over the whole log changed.
    FinalScoreUpdated {
        /// Final score.
        score: ScoreAggregate,
    },
    /// The editing session moved to another phase or its candidate changed.
    EditorChanged {
        /// Session after the change.
        editor: EditorSnapshot,
    },
    /// A candidate was accepted by the store and entered the log.
    StatCommitted {
        /// Stat as stored.
        stat: Stat,
    },
    /// The store failed a commit; the candidate was discarded.
    CommitFailed {
        /// Error reported by the store.
        message: String,
    },
    /// A committed stat was deleted.
    StatRemoved {
        /// Identifier of the deleted stat.
        id: StatId,
    },
    /// The store failed a delete; the stat is still in the log.
    DeleteFailed {
        /// Identifier of the stat that was kept.
        id: StatId,
        /// Error reported by the store.
        message: String,
    },
    /// A committed stat was corrected.
    StatCorrected {
        /// Stat after the correction.
        stat: Stat,
    },
    /// Rosters changed and the role map was rebuilt.
    RolesChanged {
        /// Number of mapped participants.
        participants: usize,
    },
    /// Player started or stopped advancing.
    PlaybackChanged {
        /// Whether the player is playing.
        is_playing: bool,
    },
    /// The player reported the media length.
    DurationResolved {
        /// Media length in seconds.
        duration: f64,
    },
}

/// Point-in-time summary of a game viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    /// Game being viewed.
    pub game_id: GameId,
    /// Clock position in seconds.
    pub time: f64,
    /// Media length, once known.
    pub duration: Option<f64>,
    /// Whether the player is playing.
    pub is_playing: bool,
    /// Score at `time`.
    pub score: ScoreAggregate,
    /// Score over the whole log.
    pub final_score: ScoreAggregate,
    /// Editing session.
    pub editor: EditorSnapshot,
    /// Number of committed stats.
    pub stats: usize,
}
