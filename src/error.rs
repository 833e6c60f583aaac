use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    state::{
        editor::EditorError,
        event_log::LogError,
        game::{GameId, ParticipantId, StatId},
        roster::RosterError,
    },
};

/// Errors surfaced by the stat tracking core to its callers.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A stat with the same identifier is already committed.
    #[error("duplicate stat id `{0}`")]
    DuplicateId(StatId),
    /// The referenced stat is not part of the committed log.
    #[error("stat `{0}` not found")]
    NotFound(StatId),
    /// The persistence collaborator does not know the game.
    #[error("game `{0}` not found")]
    GameNotFound(GameId),
    /// A participant is listed more than once across the two rosters.
    #[error("participant `{0}` is listed more than once across the rosters")]
    RosterConflict(ParticipantId),
    /// The persistence collaborator rejected or failed the operation.
    #[error("persistence failure")]
    PersistenceFailure(#[source] StorageError),
    /// The caller is not allowed to perform the mutating operation.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The viewer task has shut down and no longer accepts commands.
    #[error("viewer closed")]
    ViewerClosed,
}

impl From<StorageError> for TrackerError {
    fn from(err: StorageError) -> Self {
        TrackerError::PersistenceFailure(err)
    }
}

impl From<LogError> for TrackerError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::DuplicateId(id) => TrackerError::DuplicateId(id),
            LogError::NotFound(id) => TrackerError::NotFound(id),
            LogError::InvalidTimestamp(value) => {
                TrackerError::InvalidInput(format!("timestamp `{value}` is not a finite number"))
            }
        }
    }
}

impl From<RosterError> for TrackerError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Conflict { participant } => TrackerError::RosterConflict(participant),
            RosterError::InvalidSlot(slot) => {
                TrackerError::InvalidInput(format!("roster slot {slot} is outside 1..=4"))
            }
            RosterError::SlotCount(count) => TrackerError::InvalidInput(format!(
                "a roster holds exactly 4 slots (got {count})"
            )),
        }
    }
}

impl From<EditorError> for TrackerError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::InvalidTransition(invalid) => {
                TrackerError::InvalidState(invalid.to_string())
            }
            EditorError::NoPendingCommit => {
                TrackerError::InvalidState("no commit is in flight".into())
            }
            EditorError::TicketMismatch { .. } => {
                TrackerError::InvalidState("commit completion does not match".into())
            }
            EditorError::IncompleteCandidate => {
                TrackerError::InvalidInput("candidate has no stat kind selected".into())
            }
        }
    }
}
