//! In-process backend with per-entry expiry and LRU eviction.
//!
//! Tag index markers are held apart from the LRU order. Reads promote the
//! entry they hit but never its markers, so under a shared bound the markers
//! of the hottest entries would be evicted first and tag invalidation would
//! miss exactly those entries. A marker leaves only when it expires, when it
//! is deleted, or when the entry it points at is evicted.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::backend::{BackendError, CacheBackend};
use super::keys::{TAG_INDEX_PREFIX, TAG_INDEX_SEPARATOR};

const SOURCE: &str = "cache::memory";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

struct Slots {
    entries: LruCache<String, Entry>,
    markers: HashMap<String, Entry>,
}

impl Slots {
    fn drop_markers_of(&mut self, owner: &str) {
        self.markers.retain(|marker, _| marker_owner(marker) != Some(owner));
    }
}

/// Key a tag index marker points at, `None` for ordinary keys.
fn marker_owner(key: &str) -> Option<&str> {
    key.strip_prefix(TAG_INDEX_PREFIX)?
        .rsplit_once(TAG_INDEX_SEPARATOR)
        .map(|(_, owner)| owner)
}

/// Bounded in-memory store.
///
/// The capacity bounds cached values. Expired entries are dropped lazily when
/// read and skipped when listed. Expiry follows `tokio::time`, so a paused test
/// clock controls it.
pub struct MemoryBackend {
    slots: Mutex<Slots>,
}

impl MemoryBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: LruCache::new(capacity),
                markers: HashMap::new(),
            }),
        }
    }

    /// Number of stored entries and markers, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        let slots = self.lock("len");
        slots.entries.len() + slots.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, Slots> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    hint = "entries may be stale after panic in another thread",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let now = Instant::now();
        let mut slots = self.lock("get");

        if marker_owner(key).is_some() {
            match slots.markers.get(key) {
                None => return Ok(None),
                Some(marker) if !marker.is_expired(now) => return Ok(Some(marker.value.clone())),
                Some(_) => {}
            }
            slots.markers.remove(key);
            return Ok(None);
        }

        match slots.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        slots.entries.pop(key);
        Ok(None)
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let expires_at = match ttl {
            Some(ttl) => Some(Instant::now().checked_add(ttl).ok_or_else(|| {
                BackendError::command(format!("ttl {ttl:?} overflows the clock"))
            })?),
            None => None,
        };
        let entry = Entry { value, expires_at };
        let mut slots = self.lock("put");

        if marker_owner(key).is_some() {
            slots.markers.insert(key.to_string(), entry);
            return Ok(());
        }

        let evicted = slots.entries.push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted.filter(|(evicted_key, _)| evicted_key != key) {
            slots.drop_markers_of(&evicted_key);
            debug!(
                target: "quire::cache",
                key = %evicted_key,
                "Evicted least recently used entry"
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut slots = self.lock("delete");
        if marker_owner(key).is_some() {
            slots.markers.remove(key);
        } else {
            slots.entries.pop(key);
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let now = Instant::now();
        let mut slots = self.lock("list");
        slots.markers.retain(|_, marker| !marker.is_expired(now));

        let values = slots
            .entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone());
        let markers = slots
            .markers
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned();
        Ok(values.chain(markers).collect())
    }
}
