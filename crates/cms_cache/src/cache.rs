use std::sync::Mutex;
use std::time::{Duration, Instant};

use cms_core::CacheConfig;
use indexmap::IndexMap;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

struct Inner {
    // Insertion order doubles as recency order: `get`/`set` move the touched
    // entry to the back, so the front is always the least-recently-used entry.
    entries: IndexMap<Vec<u8>, Entry>,
}

/// A thread-safe TTL map with bounded size. Keys and values are duplicated into
/// cache-owned storage on `set`; `get` hands back a fresh copy so the caller can
/// never observe or corrupt cache-internal state.
pub struct Cache {
    inner: Mutex<Inner>,
    config: CacheConfig,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        Self { inner: Mutex::new(Inner { entries: IndexMap::new() }), config }
    }

    pub fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(Duration::from_millis(self.config.default_ttl_ms));
        let mut guard = self.inner.lock().expect("cache mutex poisoned");

        guard.entries.shift_remove(key);
        guard.entries.insert(
            key.to_vec(),
            Entry { value: value.to_vec(), expires_at: Instant::now() + ttl },
        );

        while guard.entries.len() > self.config.max_items {
            if let Some((evicted, _)) = guard.entries.shift_remove_index(0) {
                log::debug!("[CACHE] evicting LRU key ({} bytes)", evicted.len());
            } else {
                break;
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();

        let expired = matches!(guard.entries.get(key), Some(entry) if entry.expires_at <= now);
        if expired {
            guard.entries.shift_remove(key);
            return None;
        }

        let value = guard.entries.get(key).map(|e| e.value.clone())?;
        // touch: move to the back so it is least likely to be the next LRU victim
        if let Some(entry) = guard.entries.shift_remove(key) {
            guard.entries.insert(key.to_vec(), entry);
        }
        Some(value)
    }

    pub fn del(&self, key: &[u8]) {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.entries.shift_remove(key);
    }

    pub fn del_by_prefix(&self, prefix: &[u8]) {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let matching: Vec<Vec<u8>> = guard
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in matching {
            guard.entries.shift_remove(&key);
        }
    }

    /// Collects expired keys under the lock, then removes them, per the
    /// collect-then-remove rule that keeps iteration from mutating the map it
    /// walks.
    pub fn cleanup_expired(&self) -> usize {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();
        let expired: Vec<Vec<u8>> = guard
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            guard.entries.shift_remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
