use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::game::ParticipantId;

/// Number of slots on every roster.
pub const ROSTER_SIZE: usize = 4;

/// The two competing sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Home roster.
    Home,
    /// Away roster.
    Away,
}

/// Errors raised while building rosters or resolving roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// A participant is listed twice, within one roster or across both.
    #[error("participant `{participant}` is listed more than once")]
    Conflict {
        /// Participant found in more than one slot.
        participant: ParticipantId,
    },
    /// Slot numbers are 1-based and limited to [`ROSTER_SIZE`].
    #[error("roster slot {0} is outside 1..=4")]
    InvalidSlot(usize),
    /// Persisted rosters must carry exactly [`ROSTER_SIZE`] slots.
    #[error("roster must hold exactly 4 slots (got {0})")]
    SlotCount(usize),
}

/// Four participant slots of one side; an empty slot is a valid transient state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    slots: [Option<ParticipantId>; ROSTER_SIZE],
}

impl Roster {
    /// Build a roster from its slots, rejecting duplicate participants.
    pub fn from_slots(slots: [Option<ParticipantId>; ROSTER_SIZE]) -> Result<Self, RosterError> {
        let mut seen = HashSet::new();
        for participant in slots.iter().flatten() {
            if !seen.insert(*participant) {
                return Err(RosterError::Conflict {
                    participant: *participant,
                });
            }
        }
        Ok(Self { slots })
    }

    /// Participant in 1-based `slot`, if any.
    pub fn slot(&self, slot: usize) -> Result<Option<ParticipantId>, RosterError> {
        let index = slot_index(slot)?;
        Ok(self.slots[index])
    }

    /// Place `participant` in 1-based `slot`, replacing whoever sat there.
    pub fn assign(&mut self, slot: usize, participant: ParticipantId) -> Result<(), RosterError> {
        let index = slot_index(slot)?;
        let taken_elsewhere = self
            .slots
            .iter()
            .enumerate()
            .any(|(other, current)| other != index && *current == Some(participant));
        if taken_elsewhere {
            return Err(RosterError::Conflict { participant });
        }
        self.slots[index] = Some(participant);
        Ok(())
    }

    /// Empty 1-based `slot`, returning its previous occupant.
    pub fn clear(&mut self, slot: usize) -> Result<Option<ParticipantId>, RosterError> {
        let index = slot_index(slot)?;
        Ok(self.slots[index].take())
    }

    /// Assigned participants in slot order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Raw slots, empty ones included.
    pub fn slots(&self) -> &[Option<ParticipantId>; ROSTER_SIZE] {
        &self.slots
    }
}

impl TryFrom<Vec<Option<ParticipantId>>> for Roster {
    type Error = RosterError;

    fn try_from(value: Vec<Option<ParticipantId>>) -> Result<Self, Self::Error> {
        let count = value.len();
        let slots: [Option<ParticipantId>; ROSTER_SIZE] = value
            .try_into()
            .map_err(|_| RosterError::SlotCount(count))?;
        Self::from_slots(slots)
    }
}

fn slot_index(slot: usize) -> Result<usize, RosterError> {
    if (1..=ROSTER_SIZE).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(RosterError::InvalidSlot(slot))
    }
}

/// Read-only participant → side lookup derived from both rosters.
///
/// Entries keep roster order: home slots first, then away slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMap {
    sides: IndexMap<ParticipantId, Side>,
}

impl RoleMap {
    /// Side of `participant`, or `None` when it is on neither roster.
    pub fn side_of(&self, participant: ParticipantId) -> Option<Side> {
        self.sides.get(&participant).copied()
    }

    /// Number of mapped participants.
    pub fn len(&self) -> usize {
        self.sides.len()
    }

    /// Whether no participant is mapped.
    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    /// Mapped participants with their side.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, Side)> + '_ {
        self.sides.iter().map(|(id, side)| (*id, *side))
    }

    /// Participants playing for `side`.
    pub fn participants(&self, side: Side) -> impl Iterator<Item = ParticipantId> + '_ {
        self.iter()
            .filter(move |(_, candidate)| *candidate == side)
            .map(|(id, _)| id)
    }
}

/// Rebuild the role map from scratch.
///
/// A participant present on both rosters is reported, never attributed to
/// whichever side happens to be processed last.
pub fn resolve(home: &Roster, away: &Roster) -> Result<RoleMap, RosterError> {
    let mut sides = IndexMap::with_capacity(ROSTER_SIZE * 2);
    let entries = home
        .participants()
        .map(|id| (id, Side::Home))
        .chain(away.participants().map(|id| (id, Side::Away)));

    for (participant, side) in entries {
        if sides.insert(participant, side).is_some() {
            return Err(RosterError::Conflict { participant });
        }
    }

    Ok(RoleMap { sides })
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn full_roster() -> Roster {
        Roster::from_slots([
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
        ])
        .unwrap()
    }

    #[test]
    fn disjoint_rosters_map_eight_participants() {
        let home = full_roster();
        let away = full_roster();

        let roles = resolve(&home, &away).unwrap();

        assert_eq!(roles.len(), 8);
        for id in home.participants() {
            assert_eq!(roles.side_of(id), Some(Side::Home));
        }
        assert_eq!(roles.participants(Side::Away).count(), 4);
    }

    #[test]
    fn shared_participant_is_a_conflict() {
        let home = full_roster();
        let shared = home.slot(3).unwrap().unwrap();
        let mut away = full_roster();
        away.assign(1, shared).unwrap();

        assert_eq!(
            resolve(&home, &away),
            Err(RosterError::Conflict {
                participant: shared
            })
        );
    }

    #[test]
    fn unknown_participant_is_unmapped() {
        let roles = resolve(&full_roster(), &Roster::default()).unwrap();
        assert_eq!(roles.side_of(Uuid::new_v4()), None);
    }

    #[test]
    fn empty_slots_are_skipped() {
        let mut home = full_roster();
        home.clear(2).unwrap();

        let roles = resolve(&home, &full_roster()).unwrap();
        assert_eq!(roles.len(), 7);
    }

    #[test]
    fn duplicates_within_roster_are_rejected() {
        let id = Uuid::new_v4();
        assert_eq!(
            Roster::from_slots([Some(id), None, Some(id), None]),
            Err(RosterError::Conflict { participant: id })
        );

        let mut roster = full_roster();
        let existing = roster.slot(1).unwrap().unwrap();
        assert!(roster.assign(2, existing).is_err());
        assert!(roster.assign(1, existing).is_ok());
    }

    #[test]
    fn slots_are_one_based() {
        let mut roster = Roster::default();
        assert_eq!(
            roster.assign(0, Uuid::new_v4()),
            Err(RosterError::InvalidSlot(0))
        );
        assert_eq!(roster.clear(5), Err(RosterError::InvalidSlot(5)));
    }

    #[test]
    fn persisted_slot_count_is_checked() {
        assert_eq!(
            Roster::try_from(vec![None, None]),
            Err(RosterError::SlotCount(2))
        );
        assert!(Roster::try_from(vec![None; ROSTER_SIZE]).is_ok());
    }
}
