//! Timestamp-indexed projection of the committed stats of one game.
//!
//! The external store stays the source of truth; this log only mirrors what
//! it has acknowledged. Iteration order is always timestamp ascending with
//! ties broken by id, never insertion order.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    ops::Bound,
};

use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{GameId, ParticipantId, Stat, StatId, StatPatch};

/// Errors raised when mutating an [`EventLog`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogError {
    /// A stat with this id is already present.
    #[error("duplicate stat id `{0}`")]
    DuplicateId(StatId),
    /// No stat with this id is present.
    #[error("stat `{0}` not found")]
    NotFound(StatId),
    /// The timestamp is NaN or infinite.
    #[error("timestamp `{0}` is not finite")]
    InvalidTimestamp(f64),
}

/// Total order over seconds so they can key a [`BTreeSet`].
#[derive(Debug, Clone, Copy)]
struct Seconds(f64);

impl Seconds {
    /// `-0.0` and `0.0` share one key so cutoffs compare numerically.
    fn new(value: f64) -> Self {
        Self(value + 0.0)
    }
}

impl PartialEq for Seconds {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Seconds {}

impl PartialOrd for Seconds {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Seconds {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type IndexKey = (Seconds, StatId);

const LAST_ID: StatId = Uuid::from_u128(u128::MAX);

/// Committed stats of one game, keyed by id and indexed by timestamp.
#[derive(Debug, Clone)]
pub struct EventLog {
    game_id: GameId,
    stats: HashMap<StatId, Stat>,
    index: BTreeSet<IndexKey>,
    version: u64,
}

impl EventLog {
    /// Create an empty log for `game_id`.
    pub fn new(game_id: GameId) -> Self {
        Self {
            game_id,
            stats: HashMap::new(),
            index: BTreeSet::new(),
            version: 0,
        }
    }

    /// Build a log from already committed stats.
    pub fn from_stats(
        game_id: GameId,
        stats: impl IntoIterator<Item = Stat>,
    ) -> Result<Self, LogError> {
        let mut log = Self::new(game_id);
        for stat in stats {
            log.insert(stat)?;
        }
        Ok(log)
    }

    /// Game this log belongs to.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Counter bumped on every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of committed stats.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether the log holds no stat.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Look up a stat by id.
    pub fn get(&self, id: StatId) -> Option<&Stat> {
        self.stats.get(&id)
    }

    /// Add a committed stat.
    pub fn insert(&mut self, stat: Stat) -> Result<(), LogError> {
        ensure_finite(stat.timestamp)?;
        if self.stats.contains_key(&stat.id) {
            return Err(LogError::DuplicateId(stat.id));
        }

        self.index.insert((Seconds::new(stat.timestamp), stat.id));
        self.stats.insert(stat.id, stat);
        self.version += 1;
        Ok(())
    }

    /// Replace the fields present in `patch` and return the updated stat.
    pub fn update(&mut self, id: StatId, patch: &StatPatch) -> Result<&Stat, LogError> {
        if let Some(timestamp) = patch.timestamp {
            ensure_finite(timestamp)?;
        }
        let stat = self.stats.get_mut(&id).ok_or(LogError::NotFound(id))?;

        self.index.remove(&(Seconds::new(stat.timestamp), id));
        stat.apply(patch);
        self.index.insert((Seconds::new(stat.timestamp), id));
        self.version += 1;

        Ok(stat)
    }

    /// Remove a stat. Removing the same id twice fails the second time.
    pub fn remove(&mut self, id: StatId) -> Result<Stat, LogError> {
        let stat = self.stats.remove(&id).ok_or(LogError::NotFound(id))?;
        self.index.remove(&(Seconds::new(stat.timestamp), id));
        self.version += 1;
        Ok(stat)
    }

    /// Stats with `timestamp <= cutoff`, in canonical order.
    ///
    /// The iterator borrows the log, so it is lazy and can be cloned to
    /// restart it. A NaN cutoff selects nothing.
    pub fn events_up_to(&self, cutoff: f64) -> impl Iterator<Item = &Stat> + Clone + '_ {
        let upper = if cutoff.is_nan() {
            Bound::Excluded((Seconds(f64::NEG_INFINITY), Uuid::nil()))
        } else {
            Bound::Included((Seconds::new(cutoff), LAST_ID))
        };
        self.resolve(self.index.range((Bound::Unbounded, upper)))
    }

    /// Stats with `after < timestamp <= up_to`, in canonical order.
    pub fn events_between(
        &self,
        after: f64,
        up_to: f64,
    ) -> impl Iterator<Item = &Stat> + Clone + '_ {
        let (after, up_to) = (Seconds::new(after), Seconds::new(up_to));
        let empty = after.0.is_nan() || up_to.0.is_nan() || up_to < after;
        let (lower, upper) = if empty {
            let nothing = (Seconds(f64::NEG_INFINITY), Uuid::nil());
            (Bound::Included(nothing), Bound::Excluded(nothing))
        } else {
            (
                Bound::Excluded((after, LAST_ID)),
                Bound::Included((up_to, LAST_ID)),
            )
        };
        self.resolve(self.index.range((lower, upper)))
    }

    /// Every stat, in canonical order.
    pub fn all_events(&self) -> impl Iterator<Item = &Stat> + Clone + '_ {
        self.resolve(self.index.range::<IndexKey, _>(..))
    }

    /// Every stat credited to `participant`, in canonical order.
    pub fn timeline_for(
        &self,
        participant: ParticipantId,
    ) -> impl Iterator<Item = &Stat> + Clone + '_ {
        self.all_events()
            .filter(move |stat| stat.participant_id == participant)
    }

    fn resolve<'a>(
        &'a self,
        keys: impl Iterator<Item = &'a IndexKey> + Clone + 'a,
    ) -> impl Iterator<Item = &'a Stat> + Clone + 'a {
        keys.filter_map(|(_, id)| self.stats.get(id))
    }
}

fn ensure_finite(timestamp: f64) -> Result<(), LogError> {
    if timestamp.is_finite() {
        Ok(())
    } else {
        Err(LogError::InvalidTimestamp(timestamp))
    }
}
