use std::str::FromStr;

use statbook_schema::{Game, Period, OPPONENT_GOALIE};

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Plus,
    Minus,
    Goal,
    GoalMinus,
    Assist,
    AssistMinus,
    UnforcedError,
    UnforcedErrorMinus,
    ShotOnGoal,
    ShotOnGoalMinus,
    PenaltyTaken,
    PenaltyTakenMinus,
    PenaltyDrawn,
    PenaltyDrawnMinus,
}

impl FromStr for PlayerAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "plus" => Self::Plus,
            "minus" => Self::Minus,
            "goal" => Self::Goal,
            "goal_minus" => Self::GoalMinus,
            "assist" => Self::Assist,
            "assist_minus" => Self::AssistMinus,
            "unforced_error" => Self::UnforcedError,
            "unforced_error_minus" => Self::UnforcedErrorMinus,
            "shot_on_goal" => Self::ShotOnGoal,
            "shot_on_goal_minus" => Self::ShotOnGoalMinus,
            "penalty_taken" => Self::PenaltyTaken,
            "penalty_taken_minus" => Self::PenaltyTakenMinus,
            "penalty_drawn" => Self::PenaltyDrawn,
            "penalty_drawn_minus" => Self::PenaltyDrawnMinus,
            other => return Err(StoreError::UnknownAction(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    Plus,
    Minus,
}

impl FromStr for LineAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plus" => Ok(Self::Plus),
            "minus" => Ok(Self::Minus),
            other => Err(StoreError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalieAction {
    Plus,
    Minus,
    Save,
    SaveMinus,
    GoalConceded,
    GoalConcededMinus,
    Assist,
    AssistMinus,
}

impl FromStr for GoalieAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "plus" => Self::Plus,
            "minus" => Self::Minus,
            "save" => Self::Save,
            "save_minus" => Self::SaveMinus,
            "goal_conceded" => Self::GoalConceded,
            "goal_conceded_minus" => Self::GoalConcededMinus,
            "assist" => Self::Assist,
            "assist_minus" => Self::AssistMinus,
            other => return Err(StoreError::UnknownAction(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentGoalieAction {
    Save,
    SaveMinus,
    GoalConceded,
    GoalConcededMinus,
}

impl FromStr for OpponentGoalieAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "save" => Self::Save,
            "save_minus" => Self::SaveMinus,
            "goal_conceded" => Self::GoalConceded,
            "goal_conceded_minus" => Self::GoalConcededMinus,
            other => return Err(StoreError::UnknownAction(other.to_string())),
        })
    }
}

pub fn ensure_player_stats(game: &mut Game, player: &str) {
    for counters in game.player_counters_mut() {
        counters.entry(player);
    }
}

pub fn ensure_goalie_stats(game: &mut Game, goalie: &str) {
    for counters in game.goalie_counters_mut() {
        counters.entry(goalie);
    }
}

fn ensure_result(game: &mut Game) {
    for period in Period::ALL {
        game.period_score_mut(period);
    }
}

pub fn apply_player_action(game: &mut Game, player: &str, action: PlayerAction) {
    ensure_player_stats(game, player);
    ensure_result(game);
    let period = game.current_period;

    match action {
        PlayerAction::Plus => game.plusminus.increment(player),
        PlayerAction::Minus => game.plusminus.decrement(player),
        PlayerAction::Goal => {
            game.goals.increment(player);
            game.period_score_mut(period).home += 1;
            if game.opponent_goalie_enabled {
                game.opponent_goalie_goals_conceded.increment(OPPONENT_GOALIE);
            }
        }
        PlayerAction::GoalMinus => {
            if game.goals.decrement_floor(player) {
                let score = game.period_score_mut(period);
                score.home = score.home.saturating_sub(1);
                if game.opponent_goalie_enabled {
                    game.opponent_goalie_goals_conceded
                        .decrement_floor(OPPONENT_GOALIE);
                }
            }
        }
        PlayerAction::Assist => game.assists.increment(player),
        PlayerAction::AssistMinus => {
            game.assists.decrement_floor(player);
        }
        PlayerAction::UnforcedError => game.unforced_errors.increment(player),
        PlayerAction::UnforcedErrorMinus => {
            game.unforced_errors.decrement_floor(player);
        }
        PlayerAction::ShotOnGoal => game.shots_on_goal.increment(player),
        PlayerAction::ShotOnGoalMinus => {
            game.shots_on_goal.decrement_floor(player);
        }
        PlayerAction::PenaltyTaken => game.penalties_taken.increment(player),
        PlayerAction::PenaltyTakenMinus => {
            game.penalties_taken.decrement_floor(player);
        }
        PlayerAction::PenaltyDrawn => game.penalties_drawn.increment(player),
        PlayerAction::PenaltyDrawnMinus => {
            game.penalties_drawn.decrement_floor(player);
        }
    }
}

/// Plus/minus for every player of one line.
pub fn apply_line_action(game: &mut Game, line: usize, action: LineAction) -> Result<(), StoreError> {
    let players = game
        .lines
        .get(line)
        .cloned()
        .ok_or(StoreError::LineNotFound {
            index: line,
            lines: game.lines.len(),
        })?;
    for player in &players {
        ensure_player_stats(game, player);
        match action {
            LineAction::Plus => game.plusminus.increment(player),
            LineAction::Minus => game.plusminus.decrement(player),
        }
    }
    Ok(())
}

pub fn apply_goalie_action(game: &mut Game, goalie: &str, action: GoalieAction) {
    ensure_goalie_stats(game, goalie);
    ensure_result(game);
    let period = game.current_period;

    match action {
        GoalieAction::Plus => game.goalie_plusminus.increment(goalie),
        GoalieAction::Minus => game.goalie_plusminus.decrement(goalie),
        GoalieAction::Save => game.saves.increment(goalie),
        GoalieAction::SaveMinus => {
            game.saves.decrement_floor(goalie);
        }
        GoalieAction::GoalConceded => {
            game.goals_conceded.increment(goalie);
            game.period_score_mut(period).away += 1;
        }
        GoalieAction::GoalConcededMinus => {
            if game.goals_conceded.decrement_floor(goalie) {
                let score = game.period_score_mut(period);
                score.away = score.away.saturating_sub(1);
            }
        }
        GoalieAction::Assist => game.assists.increment(goalie),
        GoalieAction::AssistMinus => {
            game.assists.decrement_floor(goalie);
        }
    }
}

/// Opponent goalie counters only. Home goals come from player `Goal` events, which already
/// charge the opponent goalie, so the period score is left alone here.
pub fn apply_opponent_goalie_action(game: &mut Game, action: OpponentGoalieAction) {
    let saves = &mut game.opponent_goalie_saves;
    let conceded = &mut game.opponent_goalie_goals_conceded;
    saves.entry(OPPONENT_GOALIE);
    conceded.entry(OPPONENT_GOALIE);

    match action {
        OpponentGoalieAction::Save => saves.increment(OPPONENT_GOALIE),
        OpponentGoalieAction::SaveMinus => {
            saves.decrement_floor(OPPONENT_GOALIE);
        }
        OpponentGoalieAction::GoalConceded => conceded.increment(OPPONENT_GOALIE),
        OpponentGoalieAction::GoalConcededMinus => {
            conceded.decrement_floor(OPPONENT_GOALIE);
        }
    }
}

/// Zeroes every counter of the lined-up players and goalies and the period results.
pub fn reset_game(game: &mut Game) {
    let players: Vec<String> = game.players().map(str::to_string).collect();
    for player in &players {
        for counters in game.player_counters_mut() {
            counters.set(player, 0);
        }
    }
    let goalies = game.goalies.clone();
    for goalie in &goalies {
        game.goalie_plusminus.set(goalie, 0);
        game.saves.set(goalie, 0);
        game.goals_conceded.set(goalie, 0);
    }
    if game.opponent_goalie_enabled {
        game.opponent_goalie_saves.set(OPPONENT_GOALIE, 0);
        game.opponent_goalie_goals_conceded.set(OPPONENT_GOALIE, 0);
    }
    game.result = Game::empty_result();
}

pub fn set_period(game: &mut Game, period: Period) {
    game.current_period = period;
}

pub fn parse_period(label: &str) -> Result<Period, StoreError> {
    Period::from_label(label).ok_or_else(|| StoreError::UnknownPeriod(label.to_string()))
}
