use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use statbook_core::{
    GameCache, GameStore, LockBackend, LockPolicy, SafeFileStore, Statbook, StatbookConfig,
    StoreError,
};
use statbook_schema::{Counters, Game};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "statbook_core_it_{name}_{}_{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A document that identifies its writer: `writer + 1` games tagged with the writer id.
fn payload(writer: u64) -> Vec<Game> {
    (0..=writer)
        .map(|i| Game {
            id: Some(i),
            season: format!("writer-{writer}"),
            goals: [("7 - Doe", writer as i64)].into_iter().collect::<Counters>(),
            ..Game::default()
        })
        .collect()
}

fn config(dir: &Path, backend: LockBackend) -> StatbookConfig {
    StatbookConfig {
        lock_backend: backend,
        lock: LockPolicy {
            attempts: 200,
            backoff: Duration::from_millis(5),
        },
        ..StatbookConfig::default().with_data_dir(dir)
    }
}

fn concurrent_writers_leave_one_whole_document(backend: LockBackend) {
    let dir = scratch_dir(&format!("writers_{backend:?}"));
    let writers = 8u64;

    // Independent instances stand in for independent processes.
    let handles: Vec<_> = (1..=writers)
        .map(|writer| {
            let config = config(&dir, backend);
            thread::spawn(move || {
                let book = Statbook::open(config);
                for _ in 0..5 {
                    let mut games = payload(writer);
                    book.save_games(&mut games).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let config = config(&dir, backend);
        thread::spawn(move || {
            let book = Statbook::open(config);
            for _ in 0..200 {
                match book.load_games() {
                    Ok(games) => {
                        if let Some(first) = games.first() {
                            let writer: u64 = first.season["writer-".len()..].parse().unwrap();
                            assert_eq!(games, payload(writer));
                        }
                    }
                    Err(e) => panic!("reader saw {e}"),
                }
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    reader.join().unwrap();

    let raw = fs::read_to_string(dir.join("games.json")).unwrap();
    let games: Vec<Game> = serde_json::from_str(&raw).unwrap();
    let writer = games.len() as u64 - 1;
    assert_eq!(games, payload(writer));

    // No temp files survive.
    let leftovers: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp") || n.ends_with(".lck"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn concurrent_writers_with_os_lock() {
    concurrent_writers_leave_one_whole_document(LockBackend::Os);
}

#[test]
fn concurrent_writers_with_sentinel_lock() {
    concurrent_writers_leave_one_whole_document(LockBackend::Sentinel);
}

#[derive(Debug)]
struct CountingStore {
    inner: SafeFileStore,
    reads: Arc<AtomicUsize>,
}

impl GameStore for CountingStore {
    fn read(&self) -> Result<Vec<Game>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read()
    }

    fn write(&self, games: &[Game]) -> Result<std::time::SystemTime, StoreError> {
        self.inner.write(games)
    }

    fn modified(&self) -> Result<Option<std::time::SystemTime>, StoreError> {
        self.inner.modified()
    }
}

#[test]
fn cache_reads_disk_only_when_document_changes() {
    let dir = scratch_dir("counting");
    let config = StatbookConfig::default().with_data_dir(&dir);
    let reads = Arc::new(AtomicUsize::new(0));
    let cache = GameCache::new(CountingStore {
        inner: SafeFileStore::new(config.games_path(), config.lock_backend.build(), config.lock),
        reads: reads.clone(),
    });

    assert!(cache.get().unwrap().is_empty());
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    let games = payload(2);
    let modified = cache.store().write(&games).unwrap();
    cache.invalidate_after_write(&games, modified);
    for _ in 0..10 {
        assert_eq!(cache.get().unwrap(), games);
    }
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    // Another writer replaces the document behind the cache's back.
    let other = Statbook::open(config.clone());
    let mut newer = payload(3);
    other.save_games(&mut newer).unwrap();
    assert_eq!(cache.get().unwrap(), newer);
    assert_eq!(cache.get().unwrap(), newer);
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    cache.invalidate();
    assert_eq!(cache.get().unwrap(), newer);
    assert_eq!(reads.load(Ordering::SeqCst), 2);
}

#[test]
fn shared_instance_serializes_updates() {
    let dir = scratch_dir("shared_updates");
    let book = Arc::new(Statbook::open(config(&dir, LockBackend::Os)));
    let id = book
        .create_game(statbook_core::NewGame {
            lines: vec![vec!["7 - Doe".to_string()]],
            ..Default::default()
        })
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let book = book.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    book.update_game(id, |game| {
                        game.goals.increment("7 - Doe");
                        Ok(())
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    let watcher = {
        let book = book.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut last = 0;
            while !stop.load(Ordering::SeqCst) {
                let goals = book.game(id).unwrap().goals.get("7 - Doe");
                assert!(goals >= last);
                last = goals;
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    watcher.join().unwrap();

    assert_eq!(book.game(id).unwrap().goals.get("7 - Doe"), 100);
    let fresh = Statbook::open(book.config().clone());
    assert_eq!(fresh.game(id).unwrap().goals.get("7 - Doe"), 100);
}
