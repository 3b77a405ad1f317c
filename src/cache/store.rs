//! Cache Store Module
//!
//! Durable TTL cache engine: one JSON record file per key, atomic
//! write-then-rename updates, per-key locking and sweep/capacity passes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::cache::key::{file_stem, validate_key, ENTRY_EXTENSION, TEMP_EXTENSION};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

/// Temp files older than this are leftovers of cancelled or crashed writes.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60);

// == Store Config ==
/// Construction parameters for a `FileStore`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one record file per key
    pub root: PathBuf,
    /// TTL in seconds applied when `set` is called without one
    pub default_ttl: u64,
    /// Live-entry cap enforced after writes and by `enforce_capacity`,
    /// None = unbounded
    pub max_entries: Option<usize>,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_ttl: 3600,
            max_entries: None,
        }
    }
}

// == Removal Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Removed,
    /// Record vanished before we got the lock
    Gone,
    /// Record no longer qualifies for removal
    Kept,
}

/// A live record seen during a directory scan.
#[derive(Debug)]
struct LiveEntry {
    stem: String,
    path: PathBuf,
    created_at: i64,
}

#[derive(Debug, Default)]
struct Listing {
    entries: Vec<PathBuf>,
    temps: Vec<PathBuf>,
}

// == Key Guard ==
/// Holds one key's mutex; drops the lock slot once nobody else wants it.
struct KeyGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    stem: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.stem, |_, slot| Arc::strong_count(slot) == 1);
    }
}

// == File Store ==
/// File-backed TTL cache, safe to share across tasks behind an `Arc`.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    default_ttl: u64,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
    /// Per-key write locks, keyed by record file stem
    locks: DashMap<String, Arc<Mutex<()>>>,
    stats: StatsRecorder,
    temp_seq: AtomicU64,
    /// Approximate number of record files on disk, expired ones included
    record_count: AtomicUsize,
}

impl FileStore {
    // == Constructor ==
    /// Opens (creating if needed) a store rooted at `config.root`.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    /// Opens a store that reads time from `clock`.
    pub async fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(&config.root).await.map_err(|e| {
            CacheError::WriteFailure(format!(
                "cannot create cache root {}: {}",
                config.root.display(),
                e
            ))
        })?;

        let store = Self {
            root: config.root,
            default_ttl: config.default_ttl,
            max_entries: config.max_entries,
            clock,
            locks: DashMap::new(),
            stats: StatsRecorder::new(),
            temp_seq: AtomicU64::new(0),
            record_count: AtomicUsize::new(0),
        };
        let listing = store.list_files().await?;
        store
            .record_count
            .store(listing.entries.len(), Ordering::Relaxed);
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current time as seen by the store's clock (Unix milliseconds).
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // == Get ==
    /// Returns the value stored under `key`, or None on a miss.
    ///
    /// Absent, expired and corrupt records are all misses. Corrupt records
    /// are removed on the spot; expired ones are left for `sweep`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.get_entry(key).await.map(|entry| entry.value)
    }

    /// Like `get`, deserializing into `T`. A value of the wrong shape is a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                debug!("Cache value for '{}' has unexpected shape: {}", key, err);
                None
            }
        }
    }

    /// Returns the full live record for `key`.
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        if validate_key(key).is_err() {
            self.stats.record_miss();
            return None;
        }

        let stem = file_stem(key);
        let path = self.entry_path(&stem);

        match read_entry(&path, Some(key)).await {
            Ok(Some(entry)) if !entry.is_expired(self.clock.now_ms()) => {
                self.stats.record_hit();
                Some(entry)
            }
            Ok(Some(_)) => {
                debug!("Cache expired: {}", key);
                self.stats.record_expired();
                None
            }
            Ok(None) => {
                debug!("Cache miss: {}", key);
                self.stats.record_miss();
                None
            }
            Err(err @ CacheError::Corrupt(_)) => {
                debug!("Discarding unreadable cache record for '{}': {}", key, err);
                self.stats.record_corrupt();
                if let Err(err) = self.remove_if_stale(&stem, &path).await {
                    warn!("Failed to remove corrupt record for '{}': {}", key, err);
                }
                None
            }
            // Transient I/O trouble; the record may be fine, leave it be
            Err(err) => {
                warn!("Cache read for '{}' failed: {}", key, err);
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous record.
    ///
    /// `ttl` is in seconds; None uses the store default. Readers observe
    /// either the old or the new record, never a partial one. When the
    /// store has an entry cap and the write pushed it over, the oldest
    /// entries are evicted before returning.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        validate_key(key)?;

        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl == 0 {
            return Err(CacheError::InvalidArgument(
                "TTL must be a positive number of seconds".to_string(),
            ));
        }

        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::InvalidArgument(format!("Value is not serializable: {}", e)))?;

        let stem = file_stem(key);
        let guard = self.lock_key(&stem).await;

        let entry = CacheEntry::new(key, value, self.clock.now_ms(), ttl);
        let bytes = entry.to_bytes()?;
        if bytes.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidArgument(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        match self.write_atomic(&stem, &bytes).await {
            Ok(true) => {
                self.record_count.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(err) => {
                self.stats.record_write_failure();
                warn!("Cache write for '{}' failed: {}", key, err);
                return Err(err);
            }
        }
        drop(guard);

        debug!("Cache set: {} (ttl {}s)", key, ttl);
        self.trim_after_write().await;
        Ok(())
    }

    /// Brings the store back under its cap once the record count says it
    /// may be over. The count includes expired records, so a sweep runs
    /// first and the eviction scan only sees live entries.
    async fn trim_after_write(&self) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.record_count.load(Ordering::Relaxed) <= max {
            return;
        }

        let trimmed = match self.sweep().await {
            Ok(_) => self.evict_if_over_capacity(max).await,
            Err(err) => Err(err),
        };
        match trimmed {
            Ok(0) => {}
            Ok(evicted) => debug!("Evicted {} entries after write", evicted),
            Err(err) => warn!("Capacity check after write failed: {}", err),
        }
    }

    // == Delete ==
    /// Removes the record for `key`. Returns whether one existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let stem = file_stem(key);
        let _guard = self.lock_key(&stem).await;

        match self.remove_record(&self.entry_path(&stem)).await? {
            Removal::Removed => Ok(true),
            _ => Ok(false),
        }
    }

    // == Clear ==
    /// Removes every record. Returns the number removed.
    ///
    /// Works from a listing snapshot, taking each key's lock in turn, so a
    /// `set` racing with the clear either lands before its key is visited
    /// (and is removed) or after (and survives).
    pub async fn clear(&self) -> Result<usize> {
        let listing = self.list_files().await?;
        let mut removed = 0;

        for path in &listing.entries {
            let Some(stem) = stem_of(path) else {
                continue;
            };
            let _guard = self.lock_key(&stem).await;
            match self.remove_record(path).await {
                Ok(Removal::Removed) => removed += 1,
                Ok(_) => {}
                Err(err) => warn!("Clear could not remove {}: {}", path.display(), err),
            }
        }

        self.remove_stale_temps(&listing.temps).await;
        info!("Cache cleared: {} records removed", removed);
        Ok(removed)
    }

    // == Sweep ==
    /// Removes every expired or unparseable record.
    ///
    /// The directory listing is taken without locks; each candidate is
    /// re-checked under its own key lock before removal.
    pub async fn sweep(&self) -> Result<usize> {
        let listing = self.list_files().await?;
        let mut removed = 0;

        for path in &listing.entries {
            let Some(stem) = stem_of(path) else {
                continue;
            };
            match self.remove_if_stale(&stem, path).await {
                Ok(Removal::Removed) => removed += 1,
                Ok(_) => {}
                Err(err) => warn!("Sweep could not remove {}: {}", path.display(), err),
            }
        }

        self.remove_stale_temps(&listing.temps).await;
        self.stats.record_swept(removed);
        // Resync the estimate; anything that drifted is corrected here
        self.record_count.store(
            listing.entries.len().saturating_sub(removed),
            Ordering::Relaxed,
        );
        Ok(removed)
    }

    // == Capacity ==
    /// Evicts least-recently-set live entries until at most `max_entries` remain.
    ///
    /// Returns the number of entries evicted.
    pub async fn evict_if_over_capacity(&self, max_entries: usize) -> Result<usize> {
        let mut live = self.live_entries().await?;
        if live.len() <= max_entries {
            return Ok(0);
        }

        live.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.stem.cmp(&b.stem))
        });

        let mut remaining = live.len();
        let mut evicted = 0;
        for victim in &live {
            if remaining <= max_entries {
                break;
            }
            match self.remove_if_unchanged(victim).await {
                Ok(Removal::Removed) => {
                    evicted += 1;
                    remaining -= 1;
                }
                Ok(Removal::Gone) => remaining -= 1,
                // Re-set since the scan; it is now the newest entry
                Ok(Removal::Kept) => {}
                Err(err) => warn!("Eviction could not remove {}: {}", victim.path.display(), err),
            }
        }

        self.stats.record_evictions(evicted);
        Ok(evicted)
    }

    /// Applies the configured `max_entries` cap, if any.
    pub async fn enforce_capacity(&self) -> Result<usize> {
        match self.max_entries {
            Some(max) => self.evict_if_over_capacity(max).await,
            None => Ok(0),
        }
    }

    // == Length ==
    /// Number of live (unexpired, readable) entries.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.live_entries().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    // == Stats ==
    /// Returns current cache statistics without touching the disk.
    ///
    /// `total_entries` is the record count kept up to date by writes and
    /// removals; expired records still awaiting a sweep are included.
    pub fn stats(&self) -> CacheStats {
        self.stats
            .snapshot(self.record_count.load(Ordering::Relaxed))
    }

    // == Internals ==
    fn entry_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.{}", stem, ENTRY_EXTENSION))
    }

    async fn lock_key(&self, stem: &str) -> KeyGuard<'_> {
        let slot = self.locks.entry(stem.to_string()).or_default().clone();
        let guard = slot.lock_owned().await;
        KeyGuard {
            locks: &self.locks,
            stem: stem.to_string(),
            guard: Some(guard),
        }
    }

    /// Returns true when the write created the record rather than replacing it.
    async fn write_atomic(&self, stem: &str, bytes: &[u8]) -> Result<bool> {
        let final_path = self.entry_path(stem);
        let temp_path = self.root.join(format!(
            "{}.{}.{}.{}",
            stem,
            std::process::id(),
            self.temp_seq.fetch_add(1, Ordering::Relaxed),
            TEMP_EXTENSION
        ));

        let written: std::io::Result<bool> = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            let existed = fs::try_exists(&final_path).await?;
            fs::rename(&temp_path, &final_path).await?;
            Ok(!existed)
        }
        .await;

        match written {
            Ok(created) => Ok(created),
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(CacheError::WriteFailure(format!(
                    "{}: {}",
                    final_path.display(),
                    err
                )))
            }
        }
    }

    /// Removes the record at `path` if it is expired or unparseable.
    async fn remove_if_stale(&self, stem: &str, path: &Path) -> Result<Removal> {
        let _guard = self.lock_key(stem).await;

        let stale = match read_entry(path, None).await {
            Ok(None) => return Ok(Removal::Gone),
            Ok(Some(entry)) => entry.is_expired(self.clock.now_ms()),
            Err(CacheError::Corrupt(_)) => true,
            Err(err) => return Err(err),
        };
        if !stale {
            return Ok(Removal::Kept);
        }
        self.remove_record(path).await
    }

    /// Removes a capacity victim unless it was rewritten after the scan.
    async fn remove_if_unchanged(&self, victim: &LiveEntry) -> Result<Removal> {
        let _guard = self.lock_key(&victim.stem).await;

        match read_entry(&victim.path, None).await {
            Ok(None) => Ok(Removal::Gone),
            Ok(Some(entry)) if entry.created_at == victim.created_at => {
                self.remove_record(&victim.path).await
            }
            Ok(Some(_)) => Ok(Removal::Kept),
            // Became unparseable; drop it like sweep would
            Err(CacheError::Corrupt(_)) => self.remove_record(&victim.path).await,
            Err(err) => Err(err),
        }
    }

    /// Deletes a record file. The caller holds the key lock.
    async fn remove_record(&self, path: &Path) -> Result<Removal> {
        match fs::remove_file(path).await {
            Ok(()) => {
                let _ = self
                    .record_count
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                        Some(n.saturating_sub(1))
                    });
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Removal::Gone),
            Err(e) => Err(CacheError::WriteFailure(format!(
                "cannot remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn live_entries(&self) -> Result<Vec<LiveEntry>> {
        let listing = self.list_files().await?;
        let now = self.clock.now_ms();
        let mut live = Vec::with_capacity(listing.entries.len());

        for path in listing.entries {
            let Some(stem) = stem_of(&path) else {
                continue;
            };
            if let Ok(Some(entry)) = read_entry(&path, None).await {
                if !entry.is_expired(now) {
                    live.push(LiveEntry {
                        stem,
                        path,
                        created_at: entry.created_at,
                    });
                }
            }
        }
        Ok(live)
    }

    async fn list_files(&self) -> Result<Listing> {
        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            CacheError::Internal(format!("cannot list {}: {}", self.root.display(), e))
        })?;

        let mut listing = Listing::default();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::Internal(format!("cannot list {}: {}", self.root.display(), e)))?
        {
            let path = item.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some(ENTRY_EXTENSION) => listing.entries.push(path),
                Some(TEMP_EXTENSION) => listing.temps.push(path),
                _ => {}
            }
        }
        Ok(listing)
    }

    async fn remove_stale_temps(&self, temps: &[PathBuf]) {
        for path in temps {
            let Ok(meta) = fs::metadata(path).await else {
                continue;
            };
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or_default();
            if age >= STALE_TEMP_AGE {
                match fs::remove_file(path).await {
                    Ok(()) => debug!("Removed orphan temp file {}", path.display()),
                    Err(err) => debug!("Could not remove temp file {}: {}", path.display(), err),
                }
            }
        }
    }
}

// == Helpers ==
/// Reads a record. Ok(None) when the file does not exist; Err(Corrupt) when
/// its contents cannot be decoded; Err(Internal) for any other I/O error,
/// which says nothing about the record itself.
async fn read_entry(path: &Path, expected_key: Option<&str>) -> Result<Option<CacheEntry>> {
    use std::io::ErrorKind;

    match fs::read(path).await {
        Ok(bytes) => CacheEntry::from_bytes(&bytes, expected_key).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) => {
            Err(CacheError::Corrupt(format!("{}: {}", path.display(), e)))
        }
        Err(e) => Err(CacheError::Internal(format!(
            "cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
