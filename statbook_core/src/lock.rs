use std::{
    fmt,
    fs::{self, File, OpenOptions, TryLockError},
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Bounded acquisition policy for the write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    pub attempts: u32,
    #[serde(with = "millis")]
    pub backoff: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockBackend {
    /// OS advisory lock (`flock` / `LockFileEx`) on a sibling `.lock` file.
    #[default]
    Os,
    /// Exclusive creation of a sibling `.lck` file; for filesystems without advisory locks.
    Sentinel,
}

impl LockBackend {
    pub fn build(self) -> Box<dyn ExclusiveLock> {
        match self {
            LockBackend::Os => Box::new(OsLock),
            LockBackend::Sentinel => Box::new(SentinelLock),
        }
    }
}

/// Advisory exclusive lock over a path.
pub trait ExclusiveLock: Send + Sync + fmt::Debug {
    /// Single non-blocking attempt. `Ok(None)` means somebody else holds it.
    fn try_lock(&self, target: &Path) -> io::Result<Option<LockGuard>>;
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LockGuard {
    inner: Held,
}

#[derive(Debug)]
enum Held {
    Os(File),
    Sentinel(PathBuf),
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match &self.inner {
            Held::Os(file) => {
                if let Err(e) = file.unlock() {
                    log::warn!("failed to release advisory lock: {e}");
                }
            }
            Held::Sentinel(path) => {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("failed to remove lock file {}: {e}", path.display());
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsLock;

impl ExclusiveLock for OsLock {
    fn try_lock(&self, target: &Path) -> io::Result<Option<LockGuard>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(sibling(target, "lock"))?;
        match file.try_lock() {
            Ok(()) => Ok(Some(LockGuard {
                inner: Held::Os(file),
            })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelLock;

impl ExclusiveLock for SentinelLock {
    fn try_lock(&self, target: &Path) -> io::Result<Option<LockGuard>> {
        let path = sibling(target, "lck");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Some(LockGuard {
                inner: Held::Sentinel(path),
            })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Acquires `lock` for `target`, retrying per `policy`, then gives up with `LockTimeout`.
pub fn acquire(
    lock: &dyn ExclusiveLock,
    target: &Path,
    policy: &LockPolicy,
) -> Result<LockGuard, StoreError> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(guard) = lock
            .try_lock(target)
            .map_err(|e| StoreError::io(target, e))?
        {
            return Ok(guard);
        }
        log::debug!(
            "lock on {} busy (attempt {attempt}/{attempts})",
            target.display()
        );
        if attempt < attempts {
            thread::sleep(policy.backoff);
        }
    }
    log::warn!("giving up on lock for {}", target.display());
    Err(StoreError::LockTimeout {
        path: target.to_path_buf(),
        attempts,
    })
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    target.with_file_name(name)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Instant, SystemTime, UNIX_EPOCH};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "statbook_lock_{name}_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir.join("games.json")
    }

    #[test]
    fn sentinel_lock_is_exclusive_until_dropped() {
        let target = scratch("sentinel");
        let first = SentinelLock.try_lock(&target).unwrap();
        assert!(first.is_some());
        assert!(SentinelLock.try_lock(&target).unwrap().is_none());

        drop(first);
        assert!(!target.with_file_name("games.json.lck").exists());
        assert!(SentinelLock.try_lock(&target).unwrap().is_some());
    }

    #[test]
    fn os_lock_is_exclusive_until_dropped() {
        let target = scratch("os");
        let first = OsLock.try_lock(&target).unwrap();
        assert!(first.is_some());
        assert!(OsLock.try_lock(&target).unwrap().is_none());

        drop(first);
        assert!(OsLock.try_lock(&target).unwrap().is_some());
    }

    #[test]
    fn acquire_times_out_after_bounded_attempts() {
        let target = scratch("timeout");
        let _held = SentinelLock.try_lock(&target).unwrap().unwrap();
        let policy = LockPolicy {
            attempts: 3,
            backoff: Duration::from_millis(5),
        };

        let started = Instant::now();
        let err = acquire(&SentinelLock, &target, &policy).unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { attempts: 3, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn policy_reads_backoff_in_millis() {
        let policy: LockPolicy = serde_json::from_str(r#"{"backoff": 250}"#).unwrap();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.backoff, Duration::from_millis(250));
    }
}
