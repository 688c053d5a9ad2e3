use std::{io, path::PathBuf};

use statbook_schema::GameId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    CorruptData,
    LockTimeout,
    Io,
    Validation,
    NotFound,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The persisted document exists but does not parse. Never replaced by an empty collection.
    #[error("corrupt data in {}: {source}", path.display())]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not lock {} after {attempts} attempts", path.display())]
    LockTimeout { path: PathBuf, attempts: u32 },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {what}: {value:?}")]
    InvalidName { what: &'static str, value: String },

    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    #[error("unknown period: {0:?}")]
    UnknownPeriod(String),

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("line {index} not found in game with {lines} lines")]
    LineNotFound { index: usize, lines: usize },

    #[error("player {0:?} not found")]
    PlayerNotFound(String),

    #[error("roster file not found: {}", .0.display())]
    RosterNotFound(PathBuf),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::CorruptData { .. } => StoreErrorKind::CorruptData,
            StoreError::LockTimeout { .. } => StoreErrorKind::LockTimeout,
            StoreError::Io { .. } | StoreError::Serialize { .. } => StoreErrorKind::Io,
            StoreError::InvalidName { .. }
            | StoreError::UnknownAction(_)
            | StoreError::UnknownPeriod(_) => StoreErrorKind::Validation,
            StoreError::GameNotFound(_)
            | StoreError::LineNotFound { .. }
            | StoreError::PlayerNotFound(_)
            | StoreError::RosterNotFound(_) => StoreErrorKind::NotFound,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
