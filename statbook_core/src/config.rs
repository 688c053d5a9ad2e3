use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    lock::{LockBackend, LockPolicy},
    store, StoreError,
};

/// Weights of the game score formulas. Negative weights penalise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub goal: f64,
    pub assist: f64,
    pub shot_on_goal: f64,
    pub plusminus: f64,
    pub penalty_drawn: f64,
    pub penalty_taken: f64,
    pub unforced_error: f64,
    pub save: f64,
    pub goal_conceded: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            goal: 1.5,
            assist: 1.0,
            shot_on_goal: 0.1,
            plusminus: 0.3,
            penalty_drawn: 0.15,
            penalty_taken: -0.15,
            unforced_error: -0.2,
            save: 0.10,
            goal_conceded: -0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatbookConfig {
    pub data_dir: PathBuf,
    pub games_file: String,
    pub rosters_dir: String,
    pub lock_backend: LockBackend,
    pub lock: LockPolicy,
    pub weights: ScoreWeights,
}

impl Default for StatbookConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("gamesFiles"),
            games_file: "games.json".to_string(),
            rosters_dir: "rosters".to_string(),
            lock_backend: LockBackend::default(),
            lock: LockPolicy::default(),
            weights: ScoreWeights::default(),
        }
    }
}

impl StatbookConfig {
    /// Reads a JSON config file; fields it omits keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        store::read_json(path)?.ok_or_else(|| {
            StoreError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            )
        })
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn games_path(&self) -> PathBuf {
        self.data_dir.join(&self.games_file)
    }

    pub fn rosters_path(&self) -> PathBuf {
        self.data_dir.join(&self.rosters_dir)
    }
}
