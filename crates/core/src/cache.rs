//! Local key-value cache with time-to-live expiration.
//!
//! [`LocalStorage`] is a durable store holding one JSON document per key in a
//! directory. Every handle opened on the same `Arc<LocalStorage>` shares a
//! `tokio::sync::broadcast` change feed, so a [`CacheSlot`] can observe
//! writes made through other slots (the way a browser tab observes
//! `storage` events from other tabs) without polling.
//!
//! When a slot is opened with a TTL, values are persisted as
//! `{ "data": <value>, "timestamp": <epoch ms> }` and a read after
//! `timestamp + ttl * 60_000` ms is treated as absent and purges the key.
//! Without a TTL the raw value is stored.
//!
//! Storage failures never reach the caller: reads degrade to the slot's
//! initial value and writes become no-ops, both with a logged warning.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Default TTL used by [`get_cache`].
pub const DEFAULT_CACHE_TTL_MINS: u64 = 30;

/// Milliseconds per TTL minute.
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Buffer capacity of the change feed.
const CHANGE_CAPACITY: usize = 256;

/// Origin id used for writes that do not come from a [`CacheSlot`].
const EXTERNAL_ORIGIN: u64 = 0;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

// ---------------------------------------------------------------------------
// LocalStorage
// ---------------------------------------------------------------------------

/// A change to one key, broadcast to every subscriber of a [`LocalStorage`].
#[derive(Debug, Clone)]
pub struct StorageChange {
    pub key: String,
    /// The serialized value now stored, or `None` if the key was removed.
    pub new_value: Option<String>,
    /// Id of the slot that made the change ([`EXTERNAL_ORIGIN`] otherwise).
    origin: u64,
}

/// Directory-backed durable key-value store.
pub struct LocalStorage {
    dir: PathBuf,
    changes: broadcast::Sender<StorageChange>,
    next_handle_id: AtomicU64,
}

impl LocalStorage {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            dir,
            changes,
            next_handle_id: AtomicU64::new(EXTERNAL_ORIGIN + 1),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the raw value stored under `key`.
    pub fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the value stored under `key`.
    pub fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        self.write_from(EXTERNAL_ORIGIN, key, value)
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub fn remove_item(&self, key: &str) -> io::Result<()> {
        self.remove_from(EXTERNAL_ORIGIN, key)
    }

    /// Subscribe to changes made through any handle on this store.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    fn write_from(&self, origin: u64, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        self.notify(origin, key, Some(value.to_string()));
        Ok(())
    }

    fn remove_from(&self, origin: u64, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        }
        self.notify(origin, key, None);
        Ok(())
    }

    fn notify(&self, origin: u64, key: &str, new_value: Option<String>) {
        // No receivers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            new_value,
            origin,
        });
    }

    fn allocate_handle_id(&self) -> u64 {
        self.next_handle_id.fetch_add(1, Ordering::Relaxed)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem_for(key)))
    }
}

/// Map an arbitrary key to a safe file stem. Unreserved characters are kept,
/// everything else is hex-escaped as `%XX` per UTF-8 byte.
fn file_stem_for(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

// ---------------------------------------------------------------------------
// CacheSlot
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct CacheEnvelope<T> {
    data: T,
    timestamp: i64,
}

#[derive(Clone)]
struct Held<T> {
    value: T,
    /// Write time of the stored entry; `None` when no TTL applies.
    written_at: Option<i64>,
}

/// A typed view of one key in a [`LocalStorage`], with an in-memory copy of
/// the current value.
pub struct CacheSlot<T> {
    storage: Arc<LocalStorage>,
    key: String,
    initial: T,
    ttl_minutes: Option<u64>,
    held: Arc<RwLock<Held<T>>>,
    clock: Arc<dyn Clock>,
    id: u64,
}

impl<T> CacheSlot<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open a slot for `key`, loading the stored value or falling back to
    /// `initial` when absent, expired, or unreadable.
    pub fn open(
        storage: Arc<LocalStorage>,
        key: impl Into<String>,
        initial: T,
        ttl_minutes: Option<u64>,
    ) -> Self {
        Self::open_with_clock(storage, key, initial, ttl_minutes, Arc::new(SystemClock))
    }

    /// Same as [`CacheSlot::open`] with an explicit clock.
    pub fn open_with_clock(
        storage: Arc<LocalStorage>,
        key: impl Into<String>,
        initial: T,
        ttl_minutes: Option<u64>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = key.into();
        let id = storage.allocate_handle_id();
        let held = Held {
            value: initial.clone(),
            written_at: None,
        };
        let slot = Self {
            storage,
            key,
            initial,
            ttl_minutes,
            held: Arc::new(RwLock::new(held)),
            clock,
            id,
        };
        let loaded = slot.load();
        slot.replace_held(loaded);
        slot
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value. When the in-memory copy has expired the stored entry is
    /// read again: a newer write from another handle is adopted, an expired
    /// one is purged and `initial` returned.
    pub fn get(&self) -> T {
        let held = self
            .held
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        if self.is_expired(held.written_at) {
            tracing::debug!(key = %self.key, "Cache entry expired, reloading");
            let reloaded = self.load();
            self.replace_held(reloaded.clone());
            return reloaded.value;
        }
        held.value
    }

    /// Store `value` in memory and persist it.
    pub fn set(&self, value: T) {
        let now = self.clock.now_millis();
        let serialized = if self.ttl_minutes.is_some() {
            serde_json::to_string(&CacheEnvelope {
                data: &value,
                timestamp: now,
            })
        } else {
            serde_json::to_string(&value)
        };

        self.replace_held(Held {
            value,
            written_at: self.ttl_minutes.map(|_| now),
        });

        match serialized {
            Ok(raw) => {
                if let Err(e) = self.storage.write_from(self.id, &self.key, &raw) {
                    tracing::warn!(key = %self.key, error = %e, "Failed to write cache entry");
                }
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize cache entry");
            }
        }
    }

    /// Reset to the initial value and remove the stored entry.
    pub fn clear(&self) {
        self.purge();
    }

    /// Spawn a task applying changes made by other handles on the same
    /// storage to this slot's in-memory value. The task ends when the slot is
    /// dropped (observed on the next change) or the storage goes away.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let mut rx = self.storage.subscribe();
        let held = Arc::downgrade(&self.held);
        let key = self.key.clone();
        let id = self.id;
        let initial = self.initial.clone();
        let with_ttl = self.ttl_minutes.is_some();

        tokio::spawn(async move {
            loop {
                let change = match rx.recv().await {
                    Ok(change) => change,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(key = %key, skipped, "Cache sync lagged behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if change.origin == id || change.key != key {
                    continue;
                }
                let Some(held) = held.upgrade() else { break };

                let next = match change.new_value {
                    None => Held {
                        value: initial.clone(),
                        written_at: None,
                    },
                    Some(raw) => match decode::<T>(&raw, with_ttl) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "Ignoring unreadable cache change");
                            continue;
                        }
                    },
                };

                *held.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
            }
        })
    }

    fn load(&self) -> Held<T> {
        let fallback = Held {
            value: self.initial.clone(),
            written_at: None,
        };

        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return fallback,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read cache entry");
                return fallback;
            }
        };

        match decode::<T>(&raw, self.ttl_minutes.is_some()) {
            Ok(held) if self.is_expired(held.written_at) => {
                tracing::debug!(key = %self.key, "Discarding expired cache entry");
                if let Err(e) = self.storage.remove_from(self.id, &self.key) {
                    tracing::warn!(key = %self.key, error = %e, "Failed to purge cache entry");
                }
                fallback
            }
            Ok(held) => held,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to parse cache entry");
                fallback
            }
        }
    }

    fn purge(&self) {
        self.replace_held(Held {
            value: self.initial.clone(),
            written_at: None,
        });
        if let Err(e) = self.storage.remove_from(self.id, &self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to remove cache entry");
        }
    }

    fn is_expired(&self, written_at: Option<i64>) -> bool {
        match (self.ttl_minutes, written_at) {
            (Some(ttl), Some(written_at)) => {
                let ttl_ms = i64::try_from(ttl)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(MILLIS_PER_MINUTE);
                self.clock.now_millis() > written_at.saturating_add(ttl_ms)
            }
            _ => false,
        }
    }

    fn replace_held(&self, next: Held<T>) {
        *self
            .held
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }
}

fn decode<T: DeserializeOwned>(raw: &str, with_ttl: bool) -> Result<Held<T>, serde_json::Error> {
    if with_ttl {
        let envelope: CacheEnvelope<T> = serde_json::from_str(raw)?;
        Ok(Held {
            value: envelope.data,
            written_at: Some(envelope.timestamp),
        })
    } else {
        Ok(Held {
            value: serde_json::from_str(raw)?,
            written_at: None,
        })
    }
}

/// Open a TTL slot whose initial value is "absent".
///
/// `ttl_minutes` defaults to [`DEFAULT_CACHE_TTL_MINS`].
pub fn get_cache<T>(
    storage: Arc<LocalStorage>,
    key: impl Into<String>,
    ttl_minutes: Option<u64>,
) -> CacheSlot<Option<T>>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    CacheSlot::open(
        storage,
        key,
        None,
        Some(ttl_minutes.unwrap_or(DEFAULT_CACHE_TTL_MINS)),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
