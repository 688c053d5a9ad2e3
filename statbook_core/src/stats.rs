use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashSet},
};

use chrono::NaiveDate;
use serde::Serialize;
use statbook_schema::{CalculatedStats, Game, OPPONENT_GOALIE};

use crate::config::ScoreWeights;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub season: Option<String>,
    pub category: Option<String>,
    pub hide_zero_stats: bool,
}

impl StatsFilter {
    pub fn matches(&self, game: &Game) -> bool {
        let season_ok = match self.season.as_deref() {
            Some(season) if !season.is_empty() => game.season == season,
            _ => true,
        };
        let category_ok = match self.category.as_deref() {
            Some(category) if !category.is_empty() => game.team.as_deref() == Some(category),
            _ => true,
        };
        season_ok && category_ok
    }
}

/// One skater's counters, either for a single game or accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkaterLine {
    pub plusminus: i64,
    pub goals: i64,
    pub assists: i64,
    pub unforced_errors: i64,
    pub shots_on_goal: i64,
    pub penalties_taken: i64,
    pub penalties_drawn: i64,
}

impl SkaterLine {
    pub fn from_game(game: &Game, player: &str) -> Self {
        Self {
            plusminus: game.plusminus.get(player),
            goals: game.goals.get(player),
            assists: game.assists.get(player),
            unforced_errors: game.unforced_errors.get(player),
            shots_on_goal: game.shots_on_goal.get(player),
            penalties_taken: game.penalties_taken.get(player),
            penalties_drawn: game.penalties_drawn.get(player),
        }
    }

    fn add(&mut self, other: &SkaterLine) {
        self.plusminus += other.plusminus;
        self.goals += other.goals;
        self.assists += other.assists;
        self.unforced_errors += other.unforced_errors;
        self.shots_on_goal += other.shots_on_goal;
        self.penalties_taken += other.penalties_taken;
        self.penalties_drawn += other.penalties_drawn;
    }

    pub fn is_zero(&self) -> bool {
        *self == SkaterLine::default()
    }
}

impl ScoreWeights {
    pub fn game_score(&self, line: &SkaterLine) -> f64 {
        self.goal * line.goals as f64
            + self.assist * line.assists as f64
            + self.shot_on_goal * line.shots_on_goal as f64
            + self.plusminus * line.plusminus as f64
            + self.penalty_drawn * line.penalties_drawn as f64
            + self.penalty_taken * line.penalties_taken as f64
            + self.unforced_error * line.unforced_errors as f64
    }

    pub fn goalie_game_score(&self, saves: i64, goals_conceded: i64) -> f64 {
        self.save * saves as f64 + self.goal_conceded * goals_conceded as f64
    }
}

/// Share of shots faced that were saved, `0.0..=1.0`; `None` when no shots were faced.
pub fn save_percentage(saves: i64, goals_conceded: i64) -> Option<f64> {
    let shots = saves + goals_conceded;
    (shots > 0).then(|| saves as f64 / shots as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTotals {
    /// Games in which the player was lined up.
    pub games: u32,
    #[serde(flatten)]
    pub line: SkaterLine,
    pub game_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalieTotals {
    pub games: u32,
    /// Per-game save percentages of the games in which shots were faced.
    pub save_percentages: Vec<f64>,
    pub saves: i64,
    pub goals_conceded: i64,
    pub assists: i64,
    pub plusminus: i64,
    pub average_save_percentage: Option<f64>,
    pub game_score: f64,
}

impl GoalieTotals {
    fn is_zero(&self) -> bool {
        self.saves == 0 && self.goals_conceded == 0 && self.assists == 0 && self.plusminus == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpponentGoalieTotals {
    pub save_percentages: Vec<f64>,
    pub saves: i64,
    pub goals_conceded: i64,
    pub average_save_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedView {
    /// Indices into the aggregated slice, oldest game first.
    pub order: Vec<usize>,
    pub players: BTreeMap<String, PlayerTotals>,
    pub goalies: BTreeMap<String, GoalieTotals>,
    pub opponent_goalie: OpponentGoalieTotals,
}

impl AggregatedView {
    pub fn games<'a>(&'a self, games: &'a [Game]) -> impl Iterator<Item = &'a Game> + 'a {
        self.order.iter().filter_map(move |&i| games.get(i))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    weights: ScoreWeights,
}

impl StatsAggregator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Single pass over the games selected by `filter`. Each selected game gets its
    /// `calculated` field replaced; nothing else in `games` is touched.
    pub fn aggregate(&self, games: &mut [Game], filter: &StatsFilter) -> AggregatedView {
        let mut order: Vec<usize> = games
            .iter()
            .enumerate()
            .filter(|(_, g)| filter.matches(g))
            .map(|(i, _)| i)
            .collect();
        order.sort_by_key(|&i| (game_date(&games[i]), Reverse(i)));

        let mut players: BTreeMap<String, PlayerTotals> = BTreeMap::new();
        let mut goalies: BTreeMap<String, GoalieTotals> = BTreeMap::new();
        let mut opponent = OpponentGoalieTotals::default();

        for &i in &order {
            let calculated = self.accumulate_game(&games[i], &mut players, &mut goalies, &mut opponent);
            games[i].calculated = Some(calculated);
        }

        for totals in players.values_mut() {
            totals.game_score = self.weights.game_score(&totals.line);
        }
        for totals in goalies.values_mut() {
            totals.average_save_percentage = save_percentage(totals.saves, totals.goals_conceded);
            totals.game_score = self
                .weights
                .goalie_game_score(totals.saves, totals.goals_conceded);
        }
        opponent.average_save_percentage = save_percentage(opponent.saves, opponent.goals_conceded);

        if filter.hide_zero_stats {
            players.retain(|_, t| !t.line.is_zero());
            goalies.retain(|_, t| !t.is_zero());
        }

        AggregatedView {
            order,
            players,
            goalies,
            opponent_goalie: opponent,
        }
    }

    fn accumulate_game(
        &self,
        game: &Game,
        players: &mut BTreeMap<String, PlayerTotals>,
        goalies: &mut BTreeMap<String, GoalieTotals>,
        opponent: &mut OpponentGoalieTotals,
    ) -> CalculatedStats {
        let mut calculated = CalculatedStats::default();

        let mut seen = HashSet::new();
        for player in game.players() {
            if !seen.insert(player) {
                continue;
            }
            let totals = players.entry(player.to_string()).or_default();
            totals.games += 1;
            if !game.has_recorded_stats(player) {
                continue;
            }
            let line = SkaterLine::from_game(game, player);
            totals.line.add(&line);
            calculated
                .game_scores
                .insert(player.to_string(), self.weights.game_score(&line));
        }

        let mut seen = HashSet::new();
        for goalie in &game.goalies {
            if !seen.insert(goalie.as_str()) {
                continue;
            }
            let totals = goalies.entry(goalie.clone()).or_default();
            totals.games += 1;

            let saves = game.saves.get(goalie);
            let conceded = game.goals_conceded.get(goalie);

            let pct = save_percentage(saves, conceded);
            if let Some(pct) = pct {
                totals.save_percentages.push(pct);
                totals.saves += saves;
                totals.goals_conceded += conceded;
            }
            totals.assists += game.assists.get(goalie);
            totals.plusminus += game.goalie_plusminus.get(goalie);

            calculated.save_percentages.insert(goalie.clone(), pct);
            calculated
                .goalie_game_scores
                .insert(goalie.clone(), self.weights.goalie_game_score(saves, conceded));
        }

        if game.opponent_goalie_enabled {
            let saves = game.opponent_goalie_saves.get(OPPONENT_GOALIE);
            let conceded = game.opponent_goalie_goals_conceded.get(OPPONENT_GOALIE);
            if let Some(pct) = save_percentage(saves, conceded) {
                calculated.opponent_save_percentage = Some(pct);
                opponent.save_percentages.push(pct);
                opponent.saves += saves;
                opponent.goals_conceded += conceded;
            }
        }

        calculated
    }
}

/// `YYYY-MM-DD` date of a game; missing or malformed dates sort first.
pub fn game_date(game: &Game) -> Option<NaiveDate> {
    game.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
}
