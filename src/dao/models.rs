use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::game::StatKind;

/// Stat as stored by the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatEntity {
    /// Primary key of the stat.
    pub id: Uuid,
    /// Game the stat belongs to.
    pub game_id: Uuid,
    /// Participant credited with the action.
    pub participant_id: Uuid,
    /// Recorded action.
    pub kind: StatKind,
    /// Seconds from the start of the game video.
    pub timestamp: f64,
}

/// Payload of a create call; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStatEntity {
    /// Game the stat belongs to.
    pub game_id: Uuid,
    /// Participant credited with the action.
    pub participant_id: Uuid,
    /// Recorded action.
    pub kind: StatKind,
    /// Seconds from the start of the game video.
    pub timestamp: f64,
}

/// Partial update of a stored stat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatPatchEntity {
    /// Replacement participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<Uuid>,
    /// Replacement kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StatKind>,
    /// Replacement timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Four participant slots of one side; `null` marks an empty slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntity {
    /// Primary key of the roster.
    pub id: Uuid,
    /// Display name of the side.
    pub name: String,
    /// Participant ids in slot order.
    pub slots: Vec<Option<Uuid>>,
}

/// Game with its related rosters and stats, as returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game.
    pub name: String,
    /// Home roster.
    pub home: RosterEntity,
    /// Away roster.
    pub away: RosterEntity,
    /// Location of the recorded video.
    pub video_url: String,
    /// Committed stats; empty unless related data was requested.
    #[serde(default)]
    pub stats: Vec<StatEntity>,
}

impl NewStatEntity {
    /// Attach the identifier assigned by the store.
    pub fn with_id(self, id: Uuid) -> StatEntity {
        StatEntity {
            id,
            game_id: self.game_id,
            participant_id: self.participant_id,
            kind: self.kind,
            timestamp: self.timestamp,
        }
    }
}

impl StatEntity {
    /// Apply every field present in `patch`.
    pub fn apply(&mut self, patch: &StatPatchEntity) {
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
