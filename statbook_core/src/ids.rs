use std::collections::HashSet;

use statbook_schema::{Game, GameId};

pub fn next_game_id(games: &[Game]) -> GameId {
    games
        .iter()
        .filter_map(|g| g.id)
        .max()
        .map_or(0, |max| max + 1)
}

/// Gives every game without an id, and every later duplicate, a fresh `max + 1` id.
/// Returns whether anything changed.
pub fn ensure_game_ids(games: &mut [Game]) -> bool {
    let mut next = next_game_id(games);
    let mut seen = HashSet::new();
    let mut changed = false;

    for game in games.iter_mut() {
        match game.id {
            Some(id) if seen.insert(id) => {}
            previous => {
                log::warn!("assigning id {next} to game with id {previous:?}");
                game.id = Some(next);
                seen.insert(next);
                next += 1;
                changed = true;
            }
        }
    }
    changed
}

pub fn find_game(games: &[Game], id: GameId) -> Option<&Game> {
    games.iter().find(|g| g.id == Some(id))
}

pub fn find_game_mut(games: &mut [Game], id: GameId) -> Option<&mut Game> {
    games.iter_mut().find(|g| g.id == Some(id))
}
