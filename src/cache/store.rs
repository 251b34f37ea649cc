//! Two-tier cache store: process-local map plus durable JSON files
//!
//! Reads check the in-memory tier first, then the durable tier; a valid
//! durable hit is promoted into memory. Writes go to both tiers
//! unconditionally. Expired or corrupt durable entries are deleted the moment
//! they are seen, so `get` self-heals without waiting for the periodic sweep.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Interval between background cleanup sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Wrapper struct for cached data, stored on disk and mirrored in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the cache entry expires
    expires_at: DateTime<Utc>,
}

impl<T> StoredEntry<T> {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Timestamps of a cache entry, read without validating or purging it.
///
/// Used by the refresh controller to report cache age even for entries that
/// have already expired.
#[derive(Debug, Clone, Copy)]
pub struct EntryMetadata {
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

/// Diagnostic counters for both cache tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held in the process-local tier
    pub memory_entries: usize,
    /// Entries currently held in the durable tier
    pub durable_entries: usize,
    /// Total bytes occupied by the durable tier
    pub total_size_bytes: u64,
}

/// Two-tier TTL cache shared by the aggregator and every source adapter
///
/// Cloning is cheap: clones share the in-memory tier and point at the same
/// cache directory. The cache directory is the namespace: `clear` removes
/// every durable entry under it.
#[derive(Debug, Clone)]
pub struct FarmCache {
    /// Directory where durable entries are stored
    cache_dir: PathBuf,
    /// Process-local tier; values are kept as JSON so one map serves any type
    memory: Arc<Mutex<HashMap<String, StoredEntry<Value>>>>,
}

impl FarmCache {
    /// Creates a cache using the XDG-compliant cache directory
    /// (`~/.cache/farmscope/` on Linux, or equivalent on other platforms).
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no
    /// home directory). Runs an initial cleanup sweep.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "farmscope")?;
        let cache = Self::with_dir(project_dirs.cache_dir().to_path_buf());
        Some(cache)
    }

    /// Creates a cache with a custom directory
    ///
    /// Useful for testing or when a specific cache location is needed.
    /// Runs an initial cleanup sweep over whatever the directory holds.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        let cache = Self {
            cache_dir,
            memory: Arc::new(Mutex::new(HashMap::new())),
        };
        cache.cleanup();
        cache
    }

    /// Returns the path to the durable file for the given key
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    fn lock_memory(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredEntry<Value>>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the map itself is still usable.
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads a value from the cache
    ///
    /// Checks the process-local tier first, then the durable tier. A valid
    /// durable entry is promoted into memory. Expired entries are removed
    /// from both tiers and read as a miss; undecodable durable entries are
    /// purged. I/O errors degrade to a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Utc::now();

        {
            let mut memory = self.lock_memory();
            if let Some(entry) = memory.get(key) {
                if entry.is_valid(now) {
                    if let Ok(value) = serde_json::from_value::<T>(entry.data.clone()) {
                        debug!(key, "cache hit (memory)");
                        return Some(value);
                    }
                }
                memory.remove(key);
            }
        }

        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key, %err, "failed to read cache entry, treating as miss");
                return None;
            }
        };

        let entry: StoredEntry<Value> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, %err, "corrupt cache entry, purging");
                self.remove_file(&path, key);
                return None;
            }
        };

        if !entry.is_valid(now) {
            self.remove_file(&path, key);
            return None;
        }

        let value = match serde_json::from_value::<T>(entry.data.clone()) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "cache entry does not match requested type, purging");
                self.remove_file(&path, key);
                return None;
            }
        };

        debug!(key, "cache hit (durable), promoting to memory");
        self.lock_memory().insert(key.to_string(), entry);
        Some(value)
    }

    /// Writes a value to both tiers with the given TTL
    ///
    /// Durable-tier failures are logged and swallowed; the memory tier always
    /// receives the entry.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                warn!(key, %err, "failed to serialize value for caching");
                return;
            }
        };

        let entry = StoredEntry {
            data,
            cached_at: now,
            expires_at: now + ttl,
        };

        self.lock_memory().insert(key.to_string(), entry.clone());

        if let Err(err) = self.write_durable(key, &entry) {
            warn!(key, %err, "failed to write durable cache entry");
        }
    }

    fn write_durable(&self, key: &str, entry: &StoredEntry<Value>) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let json = serde_json::to_string_pretty(entry)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        fs::write(self.entry_path(key), json)
    }

    /// Reads an entry's timestamps without validating or purging it
    pub fn entry_metadata(&self, key: &str) -> Option<EntryMetadata> {
        {
            let memory = self.lock_memory();
            if let Some(entry) = memory.get(key) {
                return Some(EntryMetadata {
                    cached_at: entry.cached_at,
                    expires_at: entry.expires_at,
                });
            }
        }

        let content = fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: StoredEntry<Value> = serde_json::from_str(&content).ok()?;
        Some(EntryMetadata {
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
        })
    }

    /// Removes an entry from both tiers
    pub fn delete(&self, key: &str) {
        self.lock_memory().remove(key);
        self.remove_file(&self.entry_path(key), key);
    }

    /// Removes every entry whose key starts with the given prefix
    pub fn delete_prefix(&self, prefix: &str) {
        self.lock_memory().retain(|key, _| !key.starts_with(prefix));

        for (key, path) in self.durable_entries() {
            if key.starts_with(prefix) {
                self.remove_file(&path, &key);
            }
        }
    }

    /// Empties the process-local tier and removes every durable entry
    pub fn clear(&self) {
        self.lock_memory().clear();
        for (key, path) in self.durable_entries() {
            self.remove_file(&path, &key);
        }
    }

    /// Sweeps expired and corrupt entries from both tiers
    ///
    /// Background maintenance only: `get` already purges expired entries on
    /// read, so correctness never depends on this running.
    pub fn cleanup(&self) {
        let now = Utc::now();
        self.lock_memory().retain(|_, entry| entry.is_valid(now));

        for (key, path) in self.durable_entries() {
            let keep = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<StoredEntry<Value>>(&content).ok())
                .map(|entry| entry.is_valid(now))
                .unwrap_or(false);
            if !keep {
                self.remove_file(&path, &key);
            }
        }
    }

    /// Spawns a background task that sweeps both tiers every 10 minutes
    pub fn spawn_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            // Skip the first tick (immediate); construction already swept.
            interval.tick().await;
            loop {
                interval.tick().await;
                cache.cleanup();
            }
        })
    }

    /// Returns diagnostic counters for both tiers
    pub fn stats(&self) -> CacheStats {
        let memory_entries = self.lock_memory().len();

        let mut durable_entries = 0;
        let mut total_size_bytes = 0;
        for (_, path) in self.durable_entries() {
            durable_entries += 1;
            if let Ok(metadata) = fs::metadata(&path) {
                total_size_bytes += metadata.len();
            }
        }

        CacheStats {
            memory_entries,
            durable_entries,
            total_size_bytes,
        }
    }

    /// Read-through wrapper: hit returns immediately; a miss awaits the
    /// fetcher, stores its result, and returns it. A fetcher error
    /// propagates and nothing is cached.
    pub async fn cached<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            return Ok(hit);
        }

        let value = fetcher().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }

    /// Lists `(key, path)` pairs for every durable entry
    fn durable_entries(&self) -> Vec<(String, PathBuf)> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(%err, "failed to list cache directory");
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                    let key = path.file_stem()?.to_string_lossy().into_owned();
                    Some((key, path))
                } else {
                    None
                }
            })
            .collect()
    }

    fn remove_file(&self, path: &PathBuf, key: &str) {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(key, %err, "failed to remove cache entry");
            }
        }
    }
}
