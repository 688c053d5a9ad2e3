pub mod actions;
pub mod cache;
pub mod config;
mod error;
pub mod ids;
pub mod lock;
pub mod roster;
pub mod stats;
pub mod store;

use std::collections::BTreeSet;

use parking_lot::Mutex;
use statbook_schema::{Game, GameId};

pub use crate::{
    cache::GameCache,
    config::{ScoreWeights, StatbookConfig},
    error::{StoreError, StoreErrorKind},
    lock::{LockBackend, LockPolicy},
    roster::RosterStore,
    stats::{AggregatedView, StatsAggregator, StatsFilter},
    store::{GameStore, SafeFileStore},
};

/// Fields supplied when a game is created; everything else starts empty.
#[derive(Debug, Clone, Default)]
pub struct NewGame {
    pub season: String,
    pub team: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub date: Option<String>,
    pub referee1: Option<String>,
    pub referee2: Option<String>,
    pub lines: Vec<Vec<String>>,
    pub goalies: Vec<String>,
    pub opponent_goalie_enabled: bool,
}

/// Game details to change; `None` keeps the stored value. Counters and results are never
/// touched, so a corrected lineup keeps the stats already recorded.
#[derive(Debug, Clone, Default)]
pub struct GameEdit {
    pub season: Option<String>,
    pub team: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub date: Option<String>,
    pub referee1: Option<String>,
    pub referee2: Option<String>,
    pub lines: Option<Vec<Vec<String>>>,
    pub goalies: Option<Vec<String>>,
    pub opponent_goalie_enabled: Option<bool>,
}

impl GameEdit {
    pub fn apply(self, game: &mut Game) {
        if let Some(season) = self.season {
            game.season = season;
        }
        for (value, slot) in [
            (self.team, &mut game.team),
            (self.home_team, &mut game.home_team),
            (self.away_team, &mut game.away_team),
            (self.date, &mut game.date),
            (self.referee1, &mut game.referee1),
            (self.referee2, &mut game.referee2),
        ] {
            if let Some(value) = value {
                *slot = Some(value);
            }
        }
        if let Some(lines) = self.lines {
            game.lines = lines;
        }
        if let Some(goalies) = self.goalies {
            game.goalies = goalies;
        }
        if let Some(enabled) = self.opponent_goalie_enabled {
            // Recorded opponent goalie figures keep tracking switched on.
            let recorded = game.opponent_goalie_saves.iter().any(|(_, v)| v != 0)
                || game
                    .opponent_goalie_goals_conceded
                    .iter()
                    .any(|(_, v)| v != 0);
            game.opponent_goalie_enabled = enabled || recorded;
        }
    }
}

/// Process-wide entry point: one per process, created before the first request and shared
/// by reference (or `Arc`) between handlers.
#[derive(Debug)]
pub struct Statbook {
    config: StatbookConfig,
    cache: GameCache<SafeFileStore>,
    aggregator: StatsAggregator,
    rosters: RosterStore,
    // Serialises load-mutate-save cycles of this process.
    updates: Mutex<()>,
}

impl Statbook {
    pub fn open(config: StatbookConfig) -> Self {
        let store = SafeFileStore::new(config.games_path(), config.lock_backend.build(), config.lock);
        let rosters = RosterStore::new(config.rosters_path(), config.lock_backend.build(), config.lock);
        log::debug!("statbook opened at {}", config.data_dir.display());
        Self {
            aggregator: StatsAggregator::new(config.weights),
            cache: GameCache::new(store),
            rosters,
            config,
            updates: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StatbookConfig {
        &self.config
    }

    pub fn cache(&self) -> &GameCache<SafeFileStore> {
        &self.cache
    }

    pub fn rosters(&self) -> &RosterStore {
        &self.rosters
    }

    pub fn load_games(&self) -> Result<Vec<Game>, StoreError> {
        self.cache.get()
    }

    /// Assigns missing or duplicate ids in place, persists, and refreshes the cache.
    pub fn save_games(&self, games: &mut [Game]) -> Result<(), StoreError> {
        ids::ensure_game_ids(games);
        let modified = self.cache.store().write(games)?;
        self.cache.invalidate_after_write(games, modified);
        Ok(())
    }

    pub fn compute_stats(&self, games: &mut [Game], filter: &StatsFilter) -> AggregatedView {
        self.aggregator.aggregate(games, filter)
    }

    pub fn game(&self, id: GameId) -> Result<Game, StoreError> {
        let games = self.load_games()?;
        ids::find_game(&games, id)
            .cloned()
            .ok_or(StoreError::GameNotFound(id))
    }

    pub fn create_game(&self, new: NewGame) -> Result<GameId, StoreError> {
        let _updates = self.updates.lock();
        let mut games = self.load_games()?;
        let id = ids::next_game_id(&games);
        games.push(Game {
            id: Some(id),
            season: new.season,
            team: new.team,
            home_team: new.home_team,
            away_team: new.away_team,
            date: new.date,
            referee1: new.referee1,
            referee2: new.referee2,
            lines: new.lines,
            goalies: new.goalies,
            opponent_goalie_enabled: new.opponent_goalie_enabled,
            result: Game::empty_result(),
            ..Game::default()
        });
        self.save_games(&mut games)?;
        log::info!("created game {id}");
        Ok(id)
    }

    /// Loads, applies `f` to game `id` and saves, unless `f` fails.
    pub fn update_game<R>(
        &self,
        id: GameId,
        f: impl FnOnce(&mut Game) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _updates = self.updates.lock();
        let mut games = self.load_games()?;
        let game = ids::find_game_mut(&mut games, id).ok_or(StoreError::GameNotFound(id))?;
        let out = f(game)?;
        self.save_games(&mut games)?;
        Ok(out)
    }

    /// Changes the details of game `id`, keeping its counters and score.
    pub fn modify_game(&self, id: GameId, edit: GameEdit) -> Result<(), StoreError> {
        self.update_game(id, |game| {
            edit.apply(game);
            Ok(())
        })?;
        log::info!("modified game {id}");
        Ok(())
    }

    /// Replaces game `id` wholesale; the replacement always keeps `id`.
    pub fn replace_game(&self, id: GameId, mut replacement: Game) -> Result<(), StoreError> {
        replacement.id = Some(id);
        replacement.calculated = None;
        self.update_game(id, |game| {
            *game = replacement;
            Ok(())
        })?;
        log::info!("replaced game {id}");
        Ok(())
    }

    pub fn delete_game(&self, id: GameId) -> Result<(), StoreError> {
        let _updates = self.updates.lock();
        let mut games = self.load_games()?;
        let before = games.len();
        games.retain(|g| g.id != Some(id));
        if games.len() == before {
            return Err(StoreError::GameNotFound(id));
        }
        self.save_games(&mut games)?;
        log::info!("deleted game {id}");
        Ok(())
    }

    /// Distinct categories the stored games belong to.
    pub fn teams(&self) -> Result<Vec<String>, StoreError> {
        let games = self.load_games()?;
        let teams: BTreeSet<String> = games
            .into_iter()
            .filter_map(|g| g.team)
            .filter(|t| !t.is_empty())
            .collect();
        Ok(teams.into_iter().collect())
    }

    /// Seasons known from games or rosters, newest first.
    pub fn seasons(&self) -> Result<Vec<String>, StoreError> {
        let mut seasons: BTreeSet<String> = self.rosters.seasons()?.into_iter().collect();
        seasons.extend(
            self.load_games()?
                .into_iter()
                .map(|g| g.season)
                .filter(|s| !s.is_empty()),
        );
        Ok(seasons.into_iter().rev().collect())
    }
}
