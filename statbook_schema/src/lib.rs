use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type GameId = u64;

/// Fixed key under which opponent goalie counters are stored.
pub const OPPONENT_GOALIE: &str = "Opponent Goalie";

pub const DEFAULT_TESSER: &str = "U18";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1")]
    First,

    #[serde(rename = "2")]
    Second,

    #[serde(rename = "3")]
    Third,

    #[serde(rename = "OT")]
    Overtime,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::First, Period::Second, Period::Third, Period::Overtime];

    pub fn label(&self) -> &'static str {
        match self {
            Period::First => "1",
            Period::Second => "2",
            Period::Third => "3",
            Period::Overtime => "OT",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScore {
    #[serde(default)]
    pub home: u32,
    #[serde(default)]
    pub away: u32,
}

/// Per-identifier stat counters. Keys are created lazily with a zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counters(BTreeMap<String, i64>);

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a counter without materializing it; a missing key reads as 0.
    pub fn get(&self, key: &str) -> i64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Get-or-insert-zero accessor. Every mutation goes through here.
    pub fn entry(&mut self, key: &str) -> &mut i64 {
        self.0.entry(key.to_string()).or_insert(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn increment(&mut self, key: &str) {
        *self.entry(key) += 1;
    }

    pub fn decrement(&mut self, key: &str) {
        *self.entry(key) -= 1;
    }

    /// Decrements only while the counter is positive. Returns whether it changed.
    pub fn decrement_floor(&mut self, key: &str) -> bool {
        let value = self.entry(key);
        if *value > 0 {
            *value -= 1;
            true
        } else {
            false
        }
    }

    pub fn set(&mut self, key: &str, value: i64) {
        *self.entry(key) = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Counters {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Figures derived on read. Attached to a `Game` by the aggregator and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculatedStats {
    pub game_scores: BTreeMap<String, f64>,
    /// `None` means the goalie faced no shots in this game.
    pub save_percentages: BTreeMap<String, Option<f64>>,
    pub goalie_game_scores: BTreeMap<String, f64>,
    pub opponent_save_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<GameId>,
    #[serde(default)]
    pub season: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referee1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referee2: Option<String>,

    #[serde(default)]
    pub lines: Vec<Vec<String>>,
    #[serde(default)]
    pub goalies: Vec<String>,
    #[serde(default)]
    pub opponent_goalie_enabled: bool,

    #[serde(default)]
    pub result: BTreeMap<Period, PeriodScore>,
    #[serde(default)]
    pub current_period: Period,

    #[serde(default)]
    pub plusminus: Counters,
    #[serde(default)]
    pub goals: Counters,
    #[serde(default)]
    pub assists: Counters,
    #[serde(default)]
    pub unforced_errors: Counters,
    #[serde(default)]
    pub shots_on_goal: Counters,
    #[serde(default)]
    pub penalties_taken: Counters,
    #[serde(default)]
    pub penalties_drawn: Counters,

    #[serde(default)]
    pub goalie_plusminus: Counters,
    #[serde(default)]
    pub saves: Counters,
    #[serde(default)]
    pub goals_conceded: Counters,

    #[serde(default)]
    pub opponent_goalie_saves: Counters,
    #[serde(default)]
    pub opponent_goalie_goals_conceded: Counters,

    /// Keys this model does not know about (formation lists and the like).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,

    #[serde(skip)]
    pub calculated: Option<CalculatedStats>,
}

impl Game {
    pub fn empty_result() -> BTreeMap<Period, PeriodScore> {
        Period::ALL.into_iter().map(|p| (p, PeriodScore::default())).collect()
    }

    /// Period score for `period`, created at 0-0 when missing.
    pub fn period_score_mut(&mut self, period: Period) -> &mut PeriodScore {
        self.result.entry(period).or_default()
    }

    /// Final score as (home, away) summed over all periods.
    pub fn score(&self) -> (u32, u32) {
        self.result
            .values()
            .fold((0, 0), |(h, a), s| (h + s.home, a + s.away))
    }

    pub fn players(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().flatten().map(String::as_str)
    }

    pub fn has_player(&self, player: &str) -> bool {
        self.players().any(|p| p == player)
    }

    pub fn player_counters(&self) -> [&Counters; 7] {
        [
            &self.plusminus,
            &self.goals,
            &self.assists,
            &self.unforced_errors,
            &self.shots_on_goal,
            &self.penalties_taken,
            &self.penalties_drawn,
        ]
    }

    pub fn player_counters_mut(&mut self) -> [&mut Counters; 7] {
        [
            &mut self.plusminus,
            &mut self.goals,
            &mut self.assists,
            &mut self.unforced_errors,
            &mut self.shots_on_goal,
            &mut self.penalties_taken,
            &mut self.penalties_drawn,
        ]
    }

    pub fn goalie_counters_mut(&mut self) -> [&mut Counters; 4] {
        [
            &mut self.goalie_plusminus,
            &mut self.saves,
            &mut self.goals_conceded,
            &mut self.assists,
        ]
    }

    /// True when any player counter carries an entry for `player`.
    pub fn has_recorded_stats(&self, player: &str) -> bool {
        self.player_counters().iter().any(|c| c.contains(player))
    }
}

/// Reads leniently: older roster files carry empty or unknown codes, which load as `Attacker`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Position {
    #[default]
    #[serde(rename = "A")]
    Attacker,

    #[serde(rename = "C")]
    Center,

    #[serde(rename = "D")]
    Defender,

    #[serde(rename = "P")]
    Goalie,
}

impl Position {
    pub fn code(&self) -> &'static str {
        match self {
            Position::Attacker => "A",
            Position::Center => "C",
            Position::Defender => "D",
            Position::Goalie => "P",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Position::Attacker),
            "C" => Some(Position::Center),
            "D" => Some(Position::Defender),
            "P" => Some(Position::Goalie),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Position::from_code(code.trim()).unwrap_or_else(|| {
            log::warn!("unknown position code {code:?}, using A");
            Position::Attacker
        }))
    }
}

fn default_tesser() -> String {
    DEFAULT_TESSER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_tesser")]
    pub tesser: String,
}

impl RosterPlayer {
    /// Identifier used for this player inside game lines and counters.
    pub fn label(&self) -> String {
        format!("{} - {} {}", self.number, self.surname, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_entry_materializes_zero() {
        let mut c = Counters::new();
        assert_eq!(c.get("7 - Doe"), 0);
        assert!(!c.contains("7 - Doe"));

        assert_eq!(*c.entry("7 - Doe"), 0);
        assert!(c.contains("7 - Doe"));

        c.increment("7 - Doe");
        c.increment("7 - Doe");
        assert_eq!(c.get("7 - Doe"), 2);
    }

    #[test]
    fn decrement_floor_stops_at_zero() {
        let mut c: Counters = [("9 - Roe", 1)].into_iter().collect();
        assert!(c.decrement_floor("9 - Roe"));
        assert!(!c.decrement_floor("9 - Roe"));
        assert_eq!(c.get("9 - Roe"), 0);

        c.decrement("9 - Roe");
        assert_eq!(c.get("9 - Roe"), -1);
    }

    #[test]
    fn period_keys_use_labels() {
        let mut game = Game {
            result: Game::empty_result(),
            ..Game::default()
        };
        game.period_score_mut(Period::Overtime).home = 1;

        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["result"]["OT"]["home"], 1);
        assert_eq!(json["result"]["1"]["away"], 0);
        assert_eq!(json["current_period"], "1");
        assert_eq!(Period::from_label("OT"), Some(Period::Overtime));
        assert_eq!(Period::from_label("4"), None);
    }

    #[test]
    fn legacy_game_keeps_unknown_keys_and_nulls() {
        let v = serde_json::json!({
            "id": 3,
            "season": "2025-26",
            "team": null,
            "home_team": "Lions",
            "away_team": "Tigers",
            "date": "2025-10-04",
            "lines": [["7 - Doe John", "9 - Roe Jim"]],
            "goalies": ["1 - Keeper Kim"],
            "result": {"1": {"home": 2, "away": 1}, "OT": {"home": 0, "away": 0}},
            "current_period": "2",
            "goals": {"7 - Doe John": 2},
            "pp1": ["7 - Doe John"]
        });

        let game: Game = serde_json::from_value(v).unwrap();
        assert_eq!(game.id, Some(3));
        assert_eq!(game.team, None);
        assert_eq!(game.current_period, Period::Second);
        assert_eq!(game.goals.get("7 - Doe John"), 2);
        assert!(game.assists.is_empty());
        assert_eq!(game.score(), (2, 1));
        assert_eq!(game.extra["pp1"][0], "7 - Doe John");

        let back = serde_json::to_value(&game).unwrap();
        assert_eq!(back["pp1"][0], "7 - Doe John");
        assert!(back.get("calculated").is_none());
        assert!(back.get("game_scores").is_none());
    }

    #[test]
    fn recorded_stats_tracks_any_player_counter() {
        let mut game = Game {
            lines: vec![vec!["7 - Doe".to_string(), "8 - Poe".to_string()]],
            ..Game::default()
        };
        game.penalties_drawn.entry("8 - Poe");

        assert!(game.has_player("7 - Doe"));
        assert!(!game.has_recorded_stats("7 - Doe"));
        assert!(game.has_recorded_stats("8 - Poe"));
    }

    #[test]
    fn roster_player_defaults_and_label() {
        let v = serde_json::json!({
            "id": "4",
            "number": "12",
            "surname": "Rossi",
            "name": "Marco"
        });
        let p: RosterPlayer = serde_json::from_value(v).unwrap();
        assert_eq!(p.position, Position::Attacker);
        assert_eq!(p.tesser, "U18");
        assert_eq!(p.label(), "12 - Rossi Marco");

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["position"], "A");
        assert_eq!(Position::from_code("P"), Some(Position::Goalie));
    }

    #[test]
    fn unknown_position_codes_load_as_attacker() {
        let v = serde_json::json!([
            {"id": "1", "number": "4", "position": ""},
            {"id": "2", "number": "5", "position": "G"},
            {"id": "3", "number": "6", "position": null},
            {"id": "4", "number": "1", "position": "P"}
        ]);
        let roster: Vec<RosterPlayer> = serde_json::from_value(v).unwrap();
        let positions: Vec<_> = roster.iter().map(|p| p.position).collect();
        assert_eq!(
            positions,
            vec![
                Position::Attacker,
                Position::Attacker,
                Position::Attacker,
                Position::Goalie
            ]
        );
    }
}
