//! Aggregates derived from the event log and the role map.
//!
//! Everything here is a pure function of its inputs, except [`ScoreTracker`]
//! which memoises the last computed score for the viewer's clock.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::state::{
    event_log::EventLog,
    game::{ParticipantId, Stat, StatId, StatKind},
    roster::{RoleMap, Side},
};

/// Points per side. Never stored, always derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreAggregate {
    /// Home side total.
    pub home: i64,
    /// Away side total.
    pub away: i64,
}

impl ScoreAggregate {
    /// Total of `side`.
    pub fn side(&self, side: Side) -> i64 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// Add `points` to `side`. Negative values are summed as-is.
    pub fn add(&mut self, side: Side, points: i64) {
        match side {
            Side::Home => self.home += points,
            Side::Away => self.away += points,
        }
    }

    fn accumulate<'a>(mut self, roles: &RoleMap, stats: impl Iterator<Item = &'a Stat>) -> Self {
        for stat in stats {
            // Participants removed from a roster keep their history but no longer count.
            if let Some(side) = roles.side_of(stat.participant_id) {
                self.add(side, stat.kind.points());
            }
        }
        self
    }
}

/// Score including every stat with `timestamp <= cutoff`.
pub fn score_at(log: &EventLog, roles: &RoleMap, cutoff: f64) -> ScoreAggregate {
    ScoreAggregate::default().accumulate(roles, log.events_up_to(cutoff))
}

/// Score over the whole log.
pub fn final_score(log: &EventLog, roles: &RoleMap) -> ScoreAggregate {
    ScoreAggregate::default().accumulate(roles, log.all_events())
}

/// Stats credited to `participant`, in canonical order.
pub fn player_timeline(log: &EventLog, participant: ParticipantId) -> Vec<Stat> {
    log.timeline_for(participant).cloned().collect()
}

/// Per-participant totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerLine {
    /// Side of the participant.
    pub side: Side,
    /// Points scored.
    pub points: i64,
    /// Number of stats per kind.
    pub counts: BTreeMap<StatKind, u32>,
}

impl PlayerLine {
    fn new(side: Side) -> Self {
        Self {
            side,
            points: 0,
            counts: BTreeMap::new(),
        }
    }

    /// Number of `kind` stats recorded.
    pub fn count(&self, kind: StatKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Lines for every mapped participant, including those without stats.
pub fn box_score(log: &EventLog, roles: &RoleMap) -> BTreeMap<ParticipantId, PlayerLine> {
    let mut lines: BTreeMap<_, _> = roles
        .iter()
        .map(|(participant, side)| (participant, PlayerLine::new(side)))
        .collect();

    for stat in log.all_events() {
        let Some(line) = lines.get_mut(&stat.participant_id) else {
            continue;
        };
        line.points += stat.kind.points();
        *line.counts.entry(stat.kind).or_insert(0) += 1;
    }

    lines
}

/// Running score right after one scoring stat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    /// Stat that changed the score.
    pub stat_id: StatId,
    /// When it happened.
    pub timestamp: f64,
    /// Side credited.
    pub side: Side,
    /// Score after the stat.
    pub score: ScoreAggregate,
}

/// Every change of the score, in canonical order.
pub fn score_progression(log: &EventLog, roles: &RoleMap) -> Vec<ScorePoint> {
    let mut running = ScoreAggregate::default();
    log.all_events()
        .filter(|stat| stat.kind.points() != 0)
        .filter_map(|stat| {
            let side = roles.side_of(stat.participant_id)?;
            running.add(side, stat.kind.points());
            Some(ScorePoint {
                stat_id: stat.id,
                timestamp: stat.timestamp,
                side,
                score: running,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct CachedScore {
    cutoff: f64,
    log_version: u64,
    score: ScoreAggregate,
}

/// Memoised `score_at` for a clock that mostly moves forward.
///
/// Moving forward only folds in the stats between the old and new cutoff.
/// The cache is dropped when the log version changes, when the cutoff moves
/// backward, or when [`invalidate`](Self::invalidate) is called after a
/// roster change.
#[derive(Debug, Clone, Default)]
pub struct ScoreTracker {
    cached: Option<CachedScore>,
}

impl ScoreTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached score.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Score at `cutoff`, reusing the cached value when possible.
    pub fn score_at(&mut self, log: &EventLog, roles: &RoleMap, cutoff: f64) -> ScoreAggregate {
        let score = match self.cached {
            Some(cached) if cached.log_version == log.version() && cutoff >= cached.cutoff => {
                cached
                    .score
                    .accumulate(roles, log.events_between(cached.cutoff, cutoff))
            }
            _ => score_at(log, roles, cutoff),
        };

        self.cached = Some(CachedScore {
            cutoff,
            log_version: log.version(),
            score,
        });
        score
    }
}
