use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use parking_lot::Mutex;
use statbook_schema::Game;

use crate::{store::GameStore, StoreError};

#[derive(Debug, Default)]
struct CacheState {
    modified: Option<SystemTime>,
    games: Option<Vec<Game>>,
}

/// In-memory mirror of a `GameStore`, revalidated against the document's mtime.
///
/// The staleness check and the reload run under one lock so concurrent callers never observe
/// a half-swapped state. Callers always receive their own copy of the collection.
#[derive(Debug)]
pub struct GameCache<S> {
    store: S,
    state: Mutex<CacheState>,
    reloads: AtomicU64,
}

impl<S: GameStore> GameCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: Mutex::new(CacheState::default()),
            reloads: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self) -> Result<Vec<Game>, StoreError> {
        let mut state = self.state.lock();

        let Some(current) = self.store.modified()? else {
            // Deleted (or never written): empty, and forget whatever we had.
            *state = CacheState::default();
            return Ok(Vec::new());
        };

        if state.modified == Some(current) {
            if let Some(games) = &state.games {
                return Ok(games.clone());
            }
        }

        let games = self.store.read()?;
        self.reloads.fetch_add(1, Ordering::Relaxed);
        log::debug!("game cache reloaded {} games", games.len());
        state.modified = Some(current);
        state.games = Some(games.clone());
        Ok(games)
    }

    /// Installs data that was just written with mtime `modified`, avoiding a re-read.
    pub fn invalidate_after_write(&self, games: &[Game], modified: SystemTime) {
        // Derived fields are not persisted, so the cached copy must not carry them either.
        let written = games
            .iter()
            .map(|g| Game {
                calculated: None,
                ..g.clone()
            })
            .collect();
        let mut state = self.state.lock();
        state.modified = Some(modified);
        state.games = Some(written);
    }

    pub fn invalidate(&self) {
        *self.state.lock() = CacheState::default();
    }

    /// Number of times the backing store has been read.
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }
}
