//! Editing session for a single candidate stat.
//!
//! The session is pure: it never talks to the player or the store. The viewer
//! performs the side effects (pause, seek, persistence) that the returned
//! values ask for.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{GameId, ParticipantId, Stat, StatKind};

/// Default divergence (seconds) above which moving the candidate re-seeks the clock.
///
/// Must stay well above the sub-second jitter of reported player positions,
/// otherwise the clock and candidate channels keep re-triggering each other.
pub const DEFAULT_RETIME_TOLERANCE_SECS: f64 = 2.0;

/// How manual nudges of the candidate timestamp are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NudgePolicy {
    /// Nudges are applied as-is, even below zero or past the video end.
    #[default]
    Unclamped,
}

/// Identifier of an in-flight commit.
pub type CommitTicket = Uuid;

/// Uncommitted stat owned by the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Game the stat will be recorded against.
    pub game_id: GameId,
    /// Participant selected when the edit began.
    pub participant_id: ParticipantId,
    /// Kind chosen in the edit form, if any yet.
    pub kind: Option<StatKind>,
    /// Seconds from the start of the video.
    pub timestamp: f64,
}

impl Candidate {
    /// Stat with a placeholder id, as handed to the persistence collaborator.
    pub fn to_stat(&self) -> Result<Stat, EditorError> {
        let kind = self.kind.ok_or(EditorError::IncompleteCandidate)?;
        Ok(Stat {
            id: Uuid::nil(),
            game_id: self.game_id,
            participant_id: self.participant_id,
            kind,
            timestamp: self.timestamp,
        })
    }
}

/// Candidate handed to the persistence collaborator, tagged with its ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    /// Ticket matching the eventual completion.
    pub ticket: CommitTicket,
    /// Stat being created.
    pub stat: Stat,
}

/// Phases of the editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorPhase {
    /// No candidate is open.
    Idle,
    /// A candidate is open in the edit form.
    Editing(Candidate),
    /// The candidate was sent to the store and awaits its completion.
    Committing(PendingCommit),
}

/// Commands that drive the session; used to report invalid transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorCommand {
    /// Open a candidate for a participant.
    BeginEdit,
    /// Choose the stat kind.
    SelectKind,
    /// Nudge the candidate timestamp.
    AdjustTime,
    /// Follow the clock while it is scrubbed.
    LiveRetime,
    /// Discard the candidate.
    Cancel,
    /// Send the candidate to the store.
    Commit,
}

/// Error returned when a command does not apply to the current phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {command:?} cannot be applied while {from}")]
pub struct InvalidTransition {
    /// Name of the phase the session was in.
    pub from: &'static str,
    /// Command that was rejected.
    pub command: EditorCommand,
}

/// Errors raised by [`StatEditorSession`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    /// Command not valid in the current phase.
    #[error(transparent)]
    InvalidTransition(InvalidTransition),
    /// A completion arrived while nothing was being committed.
    #[error("no commit is in flight")]
    NoPendingCommit,
    /// A completion arrived for another commit than the one in flight.
    #[error("commit ticket mismatch (expected {expected}, got {got})")]
    TicketMismatch {
        /// Ticket of the commit in flight.
        expected: CommitTicket,
        /// Ticket carried by the completion.
        got: CommitTicket,
    },
    /// The candidate cannot be committed without a kind.
    #[error("candidate has no stat kind")]
    IncompleteCandidate,
}

/// New candidate timestamp and the clock seek it requires, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retime {
    /// Candidate timestamp after the command.
    pub timestamp: f64,
    /// Position the clock must be moved to, when it drifted past the tolerance.
    pub seek: Option<f64>,
}

/// Result of a commit completion.
#[derive(Debug)]
pub enum CommitOutcome<E> {
    /// The store accepted the stat; it can enter the log.
    Committed(Stat),
    /// The store failed; the candidate is gone and the user must re-enter it.
    Failed {
        /// Candidate that was discarded.
        stat: Stat,
        /// Error reported by the store.
        error: E,
    },
}

/// Read-only view of the session used by observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EditorSnapshot {
    /// No candidate open.
    Idle,
    /// Candidate open.
    Editing {
        /// Open candidate.
        candidate: Candidate,
    },
    /// Candidate awaiting the store.
    Committing {
        /// Ticket of the commit in flight.
        ticket: CommitTicket,
        /// Participant of the candidate.
        participant_id: ParticipantId,
        /// Kind of the candidate.
        kind: StatKind,
        /// Timestamp of the candidate.
        timestamp: f64,
    },
}

/// State machine coordinating one candidate at a time.
#[derive(Debug, Clone)]
pub struct StatEditorSession {
    game_id: GameId,
    phase: EditorPhase,
    tolerance: f64,
    nudge: NudgePolicy,
    clock_anchor: f64,
}

impl StatEditorSession {
    /// Create an idle session for `game_id`.
    pub fn new(game_id: GameId, tolerance: f64) -> Self {
        Self {
            game_id,
            phase: EditorPhase::Idle,
            tolerance,
            nudge: NudgePolicy::default(),
            clock_anchor: 0.0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &EditorPhase {
        &self.phase
    }

    /// Open candidate, if editing.
    pub fn candidate(&self) -> Option<&Candidate> {
        match &self.phase {
            EditorPhase::Editing(candidate) => Some(candidate),
            _ => None,
        }
    }

    /// Whether a candidate is open in the edit form.
    pub fn is_editing(&self) -> bool {
        matches!(self.phase, EditorPhase::Editing(_))
    }

    /// Bounding rule applied to nudges.
    pub fn nudge_policy(&self) -> NudgePolicy {
        self.nudge
    }

    /// Divergence threshold of the candidate → clock channel.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Snapshot suitable for observers.
    pub fn snapshot(&self) -> EditorSnapshot {
        match &self.phase {
            EditorPhase::Idle => EditorSnapshot::Idle,
            EditorPhase::Editing(candidate) => EditorSnapshot::Editing {
                candidate: candidate.clone(),
            },
            EditorPhase::Committing(pending) => EditorSnapshot::Committing {
                ticket: pending.ticket,
                participant_id: pending.stat.participant_id,
                kind: pending.stat.kind,
                timestamp: pending.stat.timestamp,
            },
        }
    }

    /// Open a candidate for `participant_id`, seeded with the clock position.
    ///
    /// Callers check the edit capability before calling; pausing the player
    /// is their side effect too.
    pub fn begin_edit(
        &mut self,
        participant_id: ParticipantId,
        clock_time: f64,
    ) -> Result<&Candidate, EditorError> {
        if !matches!(self.phase, EditorPhase::Idle) {
            return Err(self.invalid(EditorCommand::BeginEdit));
        }

        self.clock_anchor = clock_time;
        self.phase = EditorPhase::Editing(Candidate {
            game_id: self.game_id,
            participant_id,
            kind: None,
            timestamp: clock_time,
        });

        self.candidate()
            .ok_or_else(|| self.invalid(EditorCommand::BeginEdit))
    }

    /// Choose the kind of the open candidate.
    pub fn select_kind(&mut self, kind: StatKind) -> Result<(), EditorError> {
        let candidate = self.candidate_mut(EditorCommand::SelectKind)?;
        candidate.kind = Some(kind);
        Ok(())
    }

    /// Shift the candidate timestamp by `delta` seconds.
    ///
    /// The result is not clamped (see [`NudgePolicy::Unclamped`]). When the
    /// candidate ends up further than the tolerance from the last known clock
    /// position, the returned [`Retime`] asks for a seek.
    pub fn adjust_time(&mut self, delta: f64) -> Result<Retime, EditorError> {
        let anchor = self.clock_anchor;
        let tolerance = self.tolerance;
        let candidate = self.candidate_mut(EditorCommand::AdjustTime)?;
        candidate.timestamp += delta;
        let timestamp = candidate.timestamp;

        let seek = ((timestamp - anchor).abs() > tolerance).then_some(timestamp);
        if let Some(target) = seek {
            self.clock_anchor = target;
        }

        Ok(Retime { timestamp, seek })
    }

    /// Make the candidate follow a clock position reported while editing.
    pub fn live_retime(&mut self, clock_time: f64) -> Result<f64, EditorError> {
        let candidate = self.candidate_mut(EditorCommand::LiveRetime)?;
        candidate.timestamp = clock_time;
        self.clock_anchor = clock_time;
        Ok(clock_time)
    }

    /// Record where the clock actually landed after a seek requested by
    /// [`adjust_time`](Self::adjust_time), without touching the candidate.
    pub fn note_clock_position(&mut self, clock_time: f64) {
        self.clock_anchor = clock_time;
    }

    /// Discard the open candidate.
    pub fn cancel(&mut self) -> Result<Candidate, EditorError> {
        match std::mem::replace(&mut self.phase, EditorPhase::Idle) {
            EditorPhase::Editing(candidate) => Ok(candidate),
            other => {
                self.phase = other;
                Err(self.invalid(EditorCommand::Cancel))
            }
        }
    }

    /// Move the open candidate to `Committing`, returning what to persist.
    pub fn commit(&mut self) -> Result<PendingCommit, EditorError> {
        let candidate = match &self.phase {
            EditorPhase::Editing(candidate) => candidate,
            _ => return Err(self.invalid(EditorCommand::Commit)),
        };

        let pending = PendingCommit {
            ticket: Uuid::new_v4(),
            stat: candidate.to_stat()?,
        };
        self.phase = EditorPhase::Committing(pending.clone());
        Ok(pending)
    }

    /// Settle the commit identified by `ticket`; the session returns to idle
    /// whatever the outcome.
    pub fn complete_commit<E>(
        &mut self,
        ticket: CommitTicket,
        result: Result<Stat, E>,
    ) -> Result<CommitOutcome<E>, EditorError> {
        let pending = match &self.phase {
            EditorPhase::Committing(pending) => pending,
            _ => return Err(EditorError::NoPendingCommit),
        };

        if pending.ticket != ticket {
            return Err(EditorError::TicketMismatch {
                expected: pending.ticket,
                got: ticket,
            });
        }

        let stat = pending.stat.clone();
        self.phase = EditorPhase::Idle;

        Ok(match result {
            Ok(committed) => CommitOutcome::Committed(committed),
            Err(error) => CommitOutcome::Failed { stat, error },
        })
    }

    fn candidate_mut(&mut self, command: EditorCommand) -> Result<&mut Candidate, EditorError> {
        match &mut self.phase {
            EditorPhase::Editing(candidate) => Ok(candidate),
            other => Err(invalid_from(other, command)),
        }
    }

    fn invalid(&self, command: EditorCommand) -> EditorError {
        invalid_from(&self.phase, command)
    }
}

fn invalid_from(phase: &EditorPhase, command: EditorCommand) -> EditorError {
    let from = match phase {
        EditorPhase::Idle => "idle",
        EditorPhase::Editing(_) => "editing",
        EditorPhase::Committing(_) => "committing",
    };
    EditorError::InvalidTransition(InvalidTransition { from, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> StatEditorSession {
        StatEditorSession::new(Uuid::new_v4(), DEFAULT_RETIME_TOLERANCE_SECS)
    }

    fn timestamp(session: &StatEditorSession) -> f64 {
        session.candidate().unwrap().timestamp
    }

    #[test]
    fn begin_edit_seeds_clock_position() {
        let mut sm = session();
        let participant = Uuid::new_v4();

        let candidate = sm.begin_edit(participant, 45.0).unwrap();

        assert_eq!(candidate.timestamp, 45.0);
        assert_eq!(candidate.participant_id, participant);
        assert_eq!(candidate.kind, None);
    }

    #[test]
    fn nudges_accumulate() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 45.0).unwrap();

        let back = sm.adjust_time(-10.0).unwrap();
        assert_eq!(back.seek, Some(35.0));

        let forward = sm.adjust_time(2.0).unwrap();
        assert_eq!(forward.seek, None);
        assert_eq!(timestamp(&sm), 37.0);
    }

    #[test]
    fn nudge_below_zero_is_not_clamped() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 1.0).unwrap();

        let retime = sm.adjust_time(-3.0).unwrap();

        assert_eq!(sm.nudge_policy(), NudgePolicy::Unclamped);
        assert_eq!(retime.timestamp, -2.0);
        assert_eq!(retime.seek, Some(-2.0));
    }

    #[test]
    fn small_drift_does_not_seek() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();

        assert_eq!(sm.adjust_time(1.0).unwrap().seek, None);
        assert_eq!(sm.adjust_time(1.0).unwrap().seek, None);
        assert_eq!(sm.adjust_time(0.5).unwrap().seek, Some(12.5));
    }

    #[test]
    fn live_retime_tracks_clock_and_resets_anchor() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();

        assert_eq!(sm.live_retime(50.0).unwrap(), 50.0);
        assert_eq!(timestamp(&sm), 50.0);
        assert_eq!(sm.adjust_time(1.5).unwrap().seek, None);
    }

    #[test]
    fn cancel_discards_candidate() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();

        sm.cancel().unwrap();

        assert_eq!(sm.phase(), &EditorPhase::Idle);
        assert!(sm.cancel().is_err());
    }

    #[test]
    fn only_one_candidate_at_a_time() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();

        let err = sm.begin_edit(Uuid::new_v4(), 11.0).unwrap_err();
        match err {
            EditorError::InvalidTransition(InvalidTransition { from, command }) => {
                assert_eq!(from, "editing");
                assert_eq!(command, EditorCommand::BeginEdit);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn commit_requires_kind() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();

        assert_eq!(sm.commit().unwrap_err(), EditorError::IncompleteCandidate);
        assert!(sm.is_editing());
    }

    #[test]
    fn successful_commit_returns_to_idle() {
        let mut sm = session();
        let participant = Uuid::new_v4();
        sm.begin_edit(participant, 10.0).unwrap();
        sm.select_kind(StatKind::TwoPointMade).unwrap();

        let pending = sm.commit().unwrap();
        assert!(matches!(sm.phase(), EditorPhase::Committing(_)));
        assert!(sm.adjust_time(1.0).is_err());

        let stored = Stat {
            id: Uuid::new_v4(),
            ..pending.stat.clone()
        };
        let outcome = sm
            .complete_commit::<String>(pending.ticket, Ok(stored.clone()))
            .unwrap();

        match outcome {
            CommitOutcome::Committed(stat) => {
                assert_eq!(stat, stored);
                assert_eq!(stat.participant_id, participant);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(sm.phase(), &EditorPhase::Idle);
    }

    #[test]
    fn failed_commit_discards_candidate() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();
        sm.select_kind(StatKind::OnePointMade).unwrap();
        let pending = sm.commit().unwrap();

        let outcome = sm
            .complete_commit::<String>(pending.ticket, Err("offline".into()))
            .unwrap();

        assert!(matches!(outcome, CommitOutcome::Failed { .. }));
        assert_eq!(sm.phase(), &EditorPhase::Idle);
    }

    #[test]
    fn stale_completion_is_rejected() {
        let mut sm = session();
        sm.begin_edit(Uuid::new_v4(), 10.0).unwrap();
        sm.select_kind(StatKind::OnePointMade).unwrap();
        let pending = sm.commit().unwrap();
        let stale = Uuid::new_v4();

        let err = sm
            .complete_commit::<String>(stale, Err("late".into()))
            .unwrap_err();
        assert_eq!(
            err,
            EditorError::TicketMismatch {
                expected: pending.ticket,
                got: stale
            }
        );
        assert!(matches!(sm.phase(), EditorPhase::Committing(_)));

        sm.complete_commit::<String>(pending.ticket, Err("offline".into()))
            .unwrap();
        assert_eq!(
            sm.complete_commit::<String>(pending.ticket, Err("again".into()))
                .unwrap_err(),
            EditorError::NoPendingCommit
        );
    }
}
