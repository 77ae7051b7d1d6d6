//! Cache storage contract and the in-process implementation.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;
use tokio::time::Instant;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache command failed: {0}")]
    Command(String),
    #[error("cache operation timed out")]
    Timeout,
}

/// Key-value snapshot cache.
///
/// `get` returns `Ok(None)` on a miss; a miss is never an error. Callers treat
/// every `Err` as a degraded cache and fall back to the store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Readiness probe used at bootstrap.
    async fn ping(&self) -> Result<(), CacheError>;
}

struct MemoryEntry {
    value: Bytes,
    expires_at: Instant,
}

/// Bounded in-process cache with per-entry expiry and LRU eviction.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries held, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        mutex_lock(&self.entries, SOURCE, "contains")
            .peek(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN))
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value: Bytes::copy_from_slice(value),
            expires_at: Instant::now() + ttl,
        };
        mutex_lock(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        mutex_lock(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
