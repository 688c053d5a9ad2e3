use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use serde::{de::DeserializeOwned, Serialize};
use statbook_schema::Game;

use crate::{
    lock::{self, ExclusiveLock, LockPolicy},
    StoreError,
};

/// Source of the canonical game collection.
pub trait GameStore: Send + Sync {
    /// Full collection; empty when the document does not exist.
    fn read(&self) -> Result<Vec<Game>, StoreError>;

    /// Replaces the document and returns its new modification time.
    fn write(&self, games: &[Game]) -> Result<SystemTime, StoreError>;

    /// Modification time of the document, `None` when it does not exist.
    fn modified(&self) -> Result<Option<SystemTime>, StoreError>;
}

/// Games document on disk: atomic replace under an advisory write lock.
#[derive(Debug)]
pub struct SafeFileStore {
    path: PathBuf,
    lock: Box<dyn ExclusiveLock>,
    policy: LockPolicy,
}

impl SafeFileStore {
    pub fn new(path: impl Into<PathBuf>, lock: Box<dyn ExclusiveLock>, policy: LockPolicy) -> Self {
        Self {
            path: path.into(),
            lock,
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GameStore for SafeFileStore {
    fn read(&self) -> Result<Vec<Game>, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn write(&self, games: &[Game]) -> Result<SystemTime, StoreError> {
        write_json(&self.path, games, self.lock.as_ref(), &self.policy)
    }

    fn modified(&self) -> Result<Option<SystemTime>, StoreError> {
        modified(&self.path)
    }
}

pub fn modified(path: &Path) -> Result<Option<SystemTime>, StoreError> {
    match fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| StoreError::io(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Parses the JSON document at `path`. A missing file is `Ok(None)`, unparseable content is
/// `CorruptData`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptData {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    Ok(Some(value))
}

/// Writes `value` to a temp file beside `path`, fsyncs it and renames it over `path` while
/// holding the write lock. The returned mtime is strictly greater than the previous one.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    lock: &dyn ExclusiveLock,
    policy: &LockPolicy,
) -> Result<SystemTime, StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

    let _guard = lock::acquire(lock, path, policy)?;
    let previous = modified(path)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".statbook")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| StoreError::io(&dir, e))?;
    let tmp_path = tmp.path().to_path_buf();
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut out, value).map_err(|e| StoreError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        out.flush().map_err(|e| StoreError::io(&tmp_path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(&tmp_path, e))?;

    // Coarse filesystem clocks can hand out the same mtime twice; readers key off it.
    let written = tmp
        .as_file()
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|e| StoreError::io(&tmp_path, e))?;
    if let Some(prev) = previous {
        if written <= prev {
            tmp.as_file()
                .set_modified(prev + Duration::from_millis(1))
                .map_err(|e| StoreError::io(&tmp_path, e))?;
        }
    }

    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    sync_dir(&dir);

    let now = modified(path)?.ok_or_else(|| {
        StoreError::io(path, io::Error::new(io::ErrorKind::NotFound, "vanished after rename"))
    })?;
    log::debug!("wrote {}", path.display());
    Ok(now)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|f| f.sync_all()) {
        log::warn!("failed to sync directory {}: {e}", dir.display());
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
