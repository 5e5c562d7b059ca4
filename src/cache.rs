//! Bounded in-memory cache of fetched pages.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default time a cached page stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Trait for cache implementations.
pub trait Cache: Send + Sync {
    /// Get a fresh entry by key.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Store a value in the cache.
    fn set(&self, key: &str, value: Value);

    /// Delete an entry from the cache.
    fn delete(&self, key: &str);
}

/// A cached entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value.
    pub value: Value,
    /// Unix timestamp (seconds) when the entry expires.
    pub expires_at: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Cache key for a fetched page.
pub fn page_key(url: &str) -> String {
    format!("page:{}", hash_string(url.trim()))
}

/// Hash a string using SHA-256 (truncated to 16 chars for cache keys).
pub fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// In-memory cache that evicts its oldest entry when full.
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    order: Arc<RwLock<VecDeque<String>>>,
    max_entries: usize,
    ttl: Duration,
}

impl MemoryCache {
    /// Create a new memory cache.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::with_capacity(max_entries))),
            order: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Get the current number of entries, expired ones included.
    pub fn size(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or_default()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        if let (Ok(mut store), Ok(mut order)) = (self.store.write(), self.order.write()) {
            store.clear();
            order.clear();
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let store = self.store.read().ok()?;
        let entry = store.get(key)?;

        if entry.expires_at <= now_secs() {
            return None;
        }

        Some(entry.clone())
    }

    fn set(&self, key: &str, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        let (Ok(mut store), Ok(mut order)) = (self.store.write(), self.order.write()) else {
            return;
        };

        if !store.contains_key(key) {
            while store.len() >= self.max_entries {
                match order.pop_front() {
                    Some(oldest) => {
                        store.remove(&oldest);
                    }
                    None => break,
                }
            }
            order.push_back(key.to_string());
        }

        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now_secs().saturating_add(self.ttl.as_secs()),
            },
        );
    }

    fn delete(&self, key: &str) {
        let (Ok(mut store), Ok(mut order)) = (self.store.write(), self.order.write()) else {
            return;
        };

        store.remove(key);
        order.retain(|k| k != key);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(32, DEFAULT_TTL)
    }
}
