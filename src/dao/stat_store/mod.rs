#[cfg(feature = "memory-store")]
pub mod memory;

use crate::dao::models::{GameEntity, NewStatEntity, StatEntity, StatPatchEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer holding games and their stats.
///
/// The store is the source of truth; callers mirror its answers locally only
/// after a call succeeds.
pub trait StatStore: Send + Sync {
    /// Persist a new stat and return it with its assigned id.
    fn create_stat(&self, stat: NewStatEntity) -> BoxFuture<'static, StorageResult<StatEntity>>;
    /// Patch a stored stat and return it.
    fn update_stat(
        &self,
        id: Uuid,
        patch: StatPatchEntity,
    ) -> BoxFuture<'static, StorageResult<StatEntity>>;
    /// Delete a stored stat.
    fn delete_stat(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game, with rosters and stats populated when `with_related` is set.
    fn find_game(
        &self,
        id: Uuid,
        with_related: bool,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
}
