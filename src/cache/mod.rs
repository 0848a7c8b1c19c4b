//! Explicit TTL cache for settings reads.
//!
//! Constructed once per process and injected through `AppState`; expiry is
//! the only invalidation path for readers, so admin edits become visible
//! within one TTL window rather than immediately.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-memory key/value cache with per-entry expiry.
#[derive(Debug, Clone)]
pub struct SettingsCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl SettingsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached value, or `None` on miss or expiry. Expired
    /// entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let store = self.store.read().unwrap();
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut store = self.store.write().unwrap();
        store.remove(key);
        None
    }

    pub fn put(&self, key: &str, value: serde_json::Value) {
        let mut store = self.store.write().unwrap();
        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops every cached entry.
    pub fn invalidate(&self) {
        let mut store = self.store.write().unwrap();
        store.clear();
    }
}
