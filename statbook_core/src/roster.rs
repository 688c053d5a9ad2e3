use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use statbook_schema::{Position, RosterPlayer, DEFAULT_TESSER};

use crate::{
    lock::{ExclusiveLock, LockPolicy},
    store, StoreError,
};

/// Per-season, per-category roster documents under one directory.
#[derive(Debug)]
pub struct RosterStore {
    dir: PathBuf,
    lock: Box<dyn ExclusiveLock>,
    policy: LockPolicy,
}

fn valid_category(category: &str) -> bool {
    !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `YYYY` or `YYYY-YY`.
fn valid_season(season: &str) -> bool {
    let b = season.as_bytes();
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
    match b.len() {
        4 => digits(b),
        7 => digits(&b[..4]) && b[4] == b'-' && digits(&b[5..]),
        _ => false,
    }
}

impl RosterStore {
    pub fn new(dir: impl Into<PathBuf>, lock: Box<dyn ExclusiveLock>, policy: LockPolicy) -> Self {
        Self {
            dir: dir.into(),
            lock,
            policy,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `roster_<season>_<category>.json`, or `roster_<category>.json` without a season.
    pub fn roster_path(&self, category: &str, season: Option<&str>) -> Result<PathBuf, StoreError> {
        if !valid_category(category) {
            return Err(StoreError::InvalidName {
                what: "category",
                value: category.to_string(),
            });
        }
        let file = match season.map(str::trim).filter(|s| !s.is_empty()) {
            Some(season) if valid_season(season) => format!("roster_{season}_{category}.json"),
            Some(season) => {
                return Err(StoreError::InvalidName {
                    what: "season",
                    value: season.to_string(),
                })
            }
            None => format!("roster_{category}.json"),
        };
        Ok(self.dir.join(file))
    }

    pub fn load(&self, category: &str, season: Option<&str>) -> Result<Vec<RosterPlayer>, StoreError> {
        let path = self.roster_path(category, season)?;
        Ok(store::read_json(&path)?.unwrap_or_default())
    }

    pub fn save(
        &self,
        category: &str,
        season: Option<&str>,
        roster: &[RosterPlayer],
    ) -> Result<(), StoreError> {
        let path = self.roster_path(category, season)?;
        store::write_json(&path, roster, self.lock.as_ref(), &self.policy)?;
        Ok(())
    }

    /// Appends `player` with the next numeric id and returns that id.
    pub fn add_player(
        &self,
        category: &str,
        season: Option<&str>,
        mut player: RosterPlayer,
    ) -> Result<String, StoreError> {
        let mut roster = self.load(category, season)?;
        player.id = next_player_id(&roster).to_string();
        let id = player.id.clone();
        roster.push(player);
        self.save(category, season, &roster)?;
        Ok(id)
    }

    /// Imports `number, surname, name, position[, tesser[, nickname]]` lines, separated by
    /// tabs or commas. Lines with fewer than four fields are skipped. Returns how many were added.
    pub fn bulk_import(
        &self,
        category: &str,
        season: Option<&str>,
        text: &str,
    ) -> Result<usize, StoreError> {
        let mut roster = self.load(category, season)?;
        let mut next = next_player_id(&roster);
        let mut added = 0;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let parts: Vec<&str> = if line.contains('\t') {
                line.split('\t').map(str::trim).collect()
            } else {
                line.split(',').map(str::trim).collect()
            };
            if parts.len() < 4 {
                log::debug!("skipping roster line {line:?}");
                continue;
            }
            let position = if parts[3].chars().count() <= 1 {
                Position::from_code(&parts[3].to_uppercase()).unwrap_or_default()
            } else {
                Position::Attacker
            };
            roster.push(RosterPlayer {
                id: next.to_string(),
                number: parts[0].to_string(),
                surname: parts[1].to_string(),
                name: parts[2].to_string(),
                position,
                tesser: parts
                    .get(4)
                    .map_or(DEFAULT_TESSER, |t| *t)
                    .to_string(),
                nickname: parts.get(5).copied().unwrap_or_default().to_string(),
            });
            next += 1;
            added += 1;
        }

        self.save(category, season, &roster)?;
        Ok(added)
    }

    pub fn update_player(
        &self,
        category: &str,
        season: Option<&str>,
        player: RosterPlayer,
    ) -> Result<(), StoreError> {
        let mut roster = self.load(category, season)?;
        let slot = roster
            .iter_mut()
            .find(|p| p.id == player.id)
            .ok_or_else(|| StoreError::PlayerNotFound(player.id.clone()))?;
        *slot = player;
        self.save(category, season, &roster)
    }

    pub fn delete_player(&self, category: &str, season: Option<&str>, id: &str) -> Result<(), StoreError> {
        self.delete_players(category, season, &[id]).map(|_| ())
    }

    /// Removes every player whose id is listed; returns how many were removed.
    pub fn delete_players(
        &self,
        category: &str,
        season: Option<&str>,
        ids: &[&str],
    ) -> Result<usize, StoreError> {
        let mut roster = self.load(category, season)?;
        let before = roster.len();
        roster.retain(|p| !ids.contains(&p.id.as_str()));
        let removed = before - roster.len();
        self.save(category, season, &roster)?;
        Ok(removed)
    }

    pub fn delete_roster(&self, category: &str, season: Option<&str>) -> Result<(), StoreError> {
        let path = self.roster_path(category, season)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::RosterNotFound(path)),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Seasons that have at least one roster, newest first.
    pub fn seasons(&self) -> Result<Vec<String>, StoreError> {
        let mut seasons: Vec<String> = self
            .roster_names()?
            .into_iter()
            .filter_map(|(season, _)| season)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        seasons.reverse();
        Ok(seasons)
    }

    /// Categories with a roster, optionally limited to one season; sorted.
    pub fn categories(&self, season: Option<&str>) -> Result<Vec<String>, StoreError> {
        let season = season.map(str::trim).filter(|s| !s.is_empty());
        let categories: BTreeSet<String> = self
            .roster_names()?
            .into_iter()
            .filter(|(s, _)| season.is_none() || s.as_deref() == season)
            .map(|(_, category)| category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    fn roster_names(&self) -> Result<Vec<(Option<String>, String)>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|n| n.strip_prefix("roster_"))
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            match stem.split_once('_') {
                Some((season, category)) if valid_season(season) => {
                    names.push((Some(season.to_string()), category.to_string()))
                }
                _ => names.push((None, stem.to_string())),
            }
        }
        Ok(names)
    }
}

fn next_player_id(roster: &[RosterPlayer]) -> u64 {
    roster
        .iter()
        .filter_map(|p| p.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}
