//! In-process stat store backed by concurrent maps, seeded from JSON exports.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, NewStatEntity, StatEntity, StatPatchEntity},
    stat_store::StatStore,
    storage::{StorageError, StorageResult},
};

/// Failures of the in-memory store.
#[derive(Debug, Error)]
pub enum MemoryDaoError {
    /// The store was switched offline.
    #[error("memory store is offline")]
    Offline,
    /// No game with this id is stored.
    #[error("game `{0}` not found")]
    UnknownGame(Uuid),
    /// No stat with this id is stored.
    #[error("stat `{0}` not found")]
    UnknownStat(Uuid),
    /// The seed file could not be read.
    #[error("failed to read seed file `{}`", path.display())]
    ReadSeed {
        /// Seed file that was requested.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The seed file is not a JSON array of games.
    #[error("failed to parse seed file `{}`", path.display())]
    ParseSeed {
        /// Seed file holding the malformed document.
        path: PathBuf,
        /// Decoding error, with line and column.
        #[source]
        source: serde_json::Error,
    },
}

impl From<MemoryDaoError> for StorageError {
    fn from(err: MemoryDaoError) -> Self {
        match err {
            MemoryDaoError::UnknownGame(_) | MemoryDaoError::UnknownStat(_) => {
                StorageError::rejected(err.to_string())
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

#[derive(Default)]
struct Inner {
    games: DashMap<Uuid, GameEntity>,
    stats: DashMap<Uuid, StatEntity>,
    offline: AtomicBool,
}

/// [`StatStore`] keeping everything in memory.
#[derive(Clone, Default)]
pub struct MemoryStatStore {
    inner: Arc<Inner>,
}

impl MemoryStatStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `games`; embedded stats are split into the stat table.
    pub fn with_games(games: impl IntoIterator<Item = GameEntity>) -> Self {
        let store = Self::new();
        for game in games {
            store.insert_game(game);
        }
        store
    }

    /// Load a JSON array of games from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MemoryDaoError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| MemoryDaoError::ReadSeed {
            path: path.to_path_buf(),
            source,
        })?;
        let games: Vec<GameEntity> =
            serde_json::from_str(&contents).map_err(|source| MemoryDaoError::ParseSeed {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), games = games.len(), "seeded memory store");
        Ok(Self::with_games(games))
    }

    /// Add or replace a game.
    pub fn insert_game(&self, mut game: GameEntity) {
        for stat in game.stats.drain(..) {
            self.inner.stats.insert(stat.id, stat);
        }
        self.inner.games.insert(game.id, game);
    }

    /// Simulate an outage: every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Identifiers of the stored games, sorted.
    pub fn game_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.inner.games.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Number of stored stats across all games.
    pub fn stat_count(&self) -> usize {
        self.inner.stats.len()
    }

    fn ensure_online(&self) -> Result<(), MemoryDaoError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(MemoryDaoError::Offline)
        } else {
            Ok(())
        }
    }

    fn create(&self, stat: NewStatEntity) -> Result<StatEntity, MemoryDaoError> {
        self.ensure_online()?;
        if !self.inner.games.contains_key(&stat.game_id) {
            return Err(MemoryDaoError::UnknownGame(stat.game_id));
        }
        let entity = stat.with_id(Uuid::new_v4());
        self.inner.stats.insert(entity.id, entity.clone());
        Ok(entity)
    }

    fn update(&self, id: Uuid, patch: &StatPatchEntity) -> Result<StatEntity, MemoryDaoError> {
        self.ensure_online()?;
        let mut entry = self
            .inner
            .stats
            .get_mut(&id)
            .ok_or(MemoryDaoError::UnknownStat(id))?;
        entry.apply(patch);
        Ok(entry.value().clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), MemoryDaoError> {
        self.ensure_online()?;
        self.inner
            .stats
            .remove(&id)
            .map(|_| ())
            .ok_or(MemoryDaoError::UnknownStat(id))
    }

    fn find(&self, id: Uuid, with_related: bool) -> Result<Option<GameEntity>, MemoryDaoError> {
        self.ensure_online()?;
        let Some(mut game) = self.inner.games.get(&id).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        if with_related {
            game.stats = self
                .inner
                .stats
                .iter()
                .filter(|entry| entry.game_id == id)
                .map(|entry| entry.value().clone())
                .collect();
        }
        Ok(Some(game))
    }
}

impl StatStore for MemoryStatStore {
    fn create_stat(&self, stat: NewStatEntity) -> BoxFuture<'static, StorageResult<StatEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create(stat).map_err(Into::into) })
    }

    fn update_stat(
        &self,
        id: Uuid,
        patch: StatPatchEntity,
    ) -> BoxFuture<'static, StorageResult<StatEntity>> {
        let store = self.clone();
        Box::pin(async move { store.update(id, &patch).map_err(Into::into) })
    }

    fn delete_stat(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete(id).map_err(Into::into) })
    }

    fn find_game(
        &self,
        id: Uuid,
        with_related: bool,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find(id, with_related).map_err(Into::into) })
    }
}
