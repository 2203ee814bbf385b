//! TTL-aware cache services, constructed explicitly and injected where needed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Key/value cache with time-to-live semantics.
///
/// Implementations must treat an expired entry exactly like a missing one.
pub trait CacheService<V: Clone> {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V);
    fn evict(&self, key: &str) -> bool;
    /// Drop every expired entry, returning how many were removed.
    fn evict_expired(&self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Process-local cache guarded by a mutex. Entries live for `ttl`.
pub struct InMemoryTtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> InMemoryTtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.stored_at) >= self.ttl
    }
}

impl<V: Clone> CacheService<V> for InMemoryTtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: V) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    fn evict(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredEntry<V> {
    value: V,
    /// Seconds since the Unix epoch.
    stored_at: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// TTL cache persisted as a JSON file so entries survive between runs.
///
/// Reads and writes go to memory; [`flush`](FileTtlCache::flush) writes the
/// live entries back. Expiry uses wall-clock time, so a TTL shorter than a
/// second behaves like zero.
pub struct FileTtlCache<V> {
    path: PathBuf,
    ttl: Duration,
    entries: Mutex<HashMap<String, StoredEntry<V>>>,
}

impl<V: Clone + Serialize + DeserializeOwned> FileTtlCache<V> {
    /// Open the cache at `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries: HashMap<String, StoredEntry<V>> = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable cache {}: {e}", path.display());
                HashMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!("cannot read cache {}: {e}", path.display());
                HashMap::new()
            }
        };
        let cache = Self {
            path,
            ttl,
            entries: Mutex::new(entries),
        };
        let dropped = cache.evict_expired();
        log::debug!(
            "cache {}: {} live entries ({dropped} expired)",
            cache.path.display(),
            cache.len()
        );
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write live entries to disk, creating parent directories as needed.
    pub fn flush(&self) -> io::Result<()> {
        self.evict_expired();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&*self.entries.lock())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }

    fn is_live(&self, entry: &StoredEntry<V>, now: u64) -> bool {
        now.saturating_sub(entry.stored_at) < self.ttl.as_secs()
    }
}

impl<V: Clone + Serialize + DeserializeOwned> CacheService<V> for FileTtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let now = now_secs();
        match entries.get(key) {
            Some(entry) if self.is_live(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: V) {
        self.entries.lock().insert(
            key.to_string(),
            StoredEntry {
                value,
                stored_at: now_secs(),
            },
        );
    }

    fn evict(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = now_secs();
        let before = entries.len();
        entries.retain(|_, entry| self.is_live(entry, now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
