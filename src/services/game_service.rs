use tracing::{debug, info};

use crate::{
    dao::{models::GameEntity, stat_store::StatStore},
    error::TrackerError,
    state::game::{Game, GameId},
};

/// Fetch a game with its rosters and stats and check its stats are consistent.
///
/// Roster conflicts surface when the viewer resolves roles at start.
pub async fn load_game(store: &dyn StatStore, id: GameId) -> Result<Game, TrackerError> {
    let Some(entity) = store.find_game(id, true).await? else {
        return Err(TrackerError::GameNotFound(id));
    };

    validate_persisted_game(&entity)?;

    let game = Game::try_from(entity)?;
    info!(
        game_id = %game.id,
        name = %game.name,
        stats = game.stats.len(),
        "loaded game"
    );

    Ok(game)
}

fn validate_persisted_game(game: &GameEntity) -> Result<(), TrackerError> {
    for stat in &game.stats {
        if stat.game_id != game.id {
            return Err(TrackerError::InvalidState(format!(
                "stat `{}` belongs to game `{}`, not `{}`",
                stat.id, stat.game_id, game.id
            )));
        }
        if !stat.timestamp.is_finite() {
            return Err(TrackerError::InvalidState(format!(
                "stat `{}` has a non-finite timestamp",
                stat.id
            )));
        }
    }

    debug!(game_id = %game.id, "persisted game is consistent");
    Ok(())
}
