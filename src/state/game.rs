use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, NewStatEntity, StatEntity, StatPatchEntity},
    state::roster::{Roster, RosterError},
};

/// Identifier of a committed stat.
pub type StatId = Uuid;
/// Identifier of a game.
pub type GameId = Uuid;
/// Identifier of a participant (player) listed on a roster.
pub type ParticipantId = Uuid;

/// Closed set of actions that can be recorded against a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Made one-point shot.
    OnePointMade,
    /// Made two-point shot.
    TwoPointMade,
    /// Missed one-point shot.
    OnePointMissed,
    /// Missed two-point shot.
    TwoPointMissed,
    /// Offensive or defensive rebound.
    Rebound,
    /// Pass leading directly to a score.
    Assist,
    /// Ball stolen from the opponent.
    Steal,
    /// Blocked shot.
    Block,
    /// Possession lost.
    Turnover,
    /// Personal foul.
    Foul,
}

impl StatKind {
    /// Every kind, in declaration order.
    pub const ALL: [StatKind; 10] = [
        StatKind::OnePointMade,
        StatKind::TwoPointMade,
        StatKind::OnePointMissed,
        StatKind::TwoPointMissed,
        StatKind::Rebound,
        StatKind::Assist,
        StatKind::Steal,
        StatKind::Block,
        StatKind::Turnover,
        StatKind::Foul,
    ];

    /// Points this action adds to the participant's side.
    pub const fn points(self) -> i64 {
        match self {
            StatKind::OnePointMade => 1,
            StatKind::TwoPointMade => 2,
            _ => 0,
        }
    }
}

/// A committed, timestamped action attributed to one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Identifier assigned by the persistence collaborator.
    pub id: StatId,
    /// Game the stat belongs to.
    pub game_id: GameId,
    /// Participant credited with the action.
    pub participant_id: ParticipantId,
    /// Recorded action.
    pub kind: StatKind,
    /// Seconds from the start of the game video.
    pub timestamp: f64,
}

impl Stat {
    /// Apply every field present in `patch`.
    pub fn apply(&mut self, patch: &StatPatch) {
        if let Some(participant_id) = patch.participant_id {
            self.participant_id = participant_id;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
    }
}

/// Partial update of a committed stat; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatPatch {
    /// Replacement participant.
    pub participant_id: Option<ParticipantId>,
    /// Replacement kind.
    pub kind: Option<StatKind>,
    /// Replacement timestamp in seconds.
    pub timestamp: Option<f64>,
}

impl StatPatch {
    /// Patch that only moves the stat in time.
    pub fn timestamp(timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }
}

/// A game as loaded from the persistence collaborator with its related data.
#[derive(Debug, Clone)]
pub struct Game {
    /// Primary key of the game.
    pub id: GameId,
    /// Display name of the game.
    pub name: String,
    /// Home side roster.
    pub home: Roster,
    /// Away side roster.
    pub away: Roster,
    /// Location of the recorded video, opaque to the core.
    pub video_url: String,
    /// Every committed stat of the game.
    pub stats: Vec<Stat>,
}

impl From<StatEntity> for Stat {
    fn from(value: StatEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            participant_id: value.participant_id,
            kind: value.kind,
            timestamp: value.timestamp,
        }
    }
}

impl From<Stat> for StatEntity {
    fn from(value: Stat) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            participant_id: value.participant_id,
            kind: value.kind,
            timestamp: value.timestamp,
        }
    }
}

impl From<StatPatch> for StatPatchEntity {
    fn from(value: StatPatch) -> Self {
        Self {
            participant_id: value.participant_id,
            kind: value.kind,
            timestamp: value.timestamp,
        }
    }
}

impl From<&Stat> for NewStatEntity {
    fn from(value: &Stat) -> Self {
        Self {
            game_id: value.game_id,
            participant_id: value.participant_id,
            kind: value.kind,
            timestamp: value.timestamp,
        }
    }
}

impl TryFrom<GameEntity> for Game {
    type Error = RosterError;

    fn try_from(value: GameEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            name: value.name,
            home: Roster::try_from(value.home.slots)?,
            away: Roster::try_from(value.away.slots)?,
            video_url: value.video_url,
            stats: value.stats.into_iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_made_shots_score() {
        let scoring: Vec<_> = StatKind::ALL
            .into_iter()
            .filter(|kind| kind.points() != 0)
            .collect();
        assert_eq!(scoring, vec![StatKind::OnePointMade, StatKind::TwoPointMade]);
        assert_eq!(StatKind::TwoPointMade.points(), 2);
    }

    #[test]
    fn patch_replaces_present_fields_only() {
        let mut stat = Stat {
            id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            participant_id: Uuid::new_v4(),
            kind: StatKind::Rebound,
            timestamp: 12.5,
        };
        let participant = stat.participant_id;

        stat.apply(&StatPatch::timestamp(14.0));

        assert_eq!(stat.timestamp, 14.0);
        assert_eq!(stat.kind, StatKind::Rebound);
        assert_eq!(stat.participant_id, participant);
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let json = serde_json::to_string(&StatKind::OnePointMade).unwrap();
        assert_eq!(json, "\"one_point_made\"");
    }
}
