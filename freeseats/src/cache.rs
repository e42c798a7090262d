use crate::domain::CacheEntry;
use crate::ports::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Why an entry left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Expired,
    Deleted,
}

/// Mutex-guarded map whose entries expire a fixed `ttl` after their last write.
/// Expired entries are dropped lazily when read. A zero `ttl` disables the cache.
pub struct TtlCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    removal_log: Option<String>,
}

impl<K, V> TtlCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            removal_log: None,
        }
    }

    /// Log every removal at info level, tagged with `name`
    pub fn with_removal_log(mut self, name: impl Into<String>) -> Self {
        self.removal_log = Some(name.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    // Every critical section is a single map operation, so a panicking holder cannot leave
    // the map half-updated
    fn entries(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                self.log_removed(key, RemovalReason::Expired);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: K, value: V) {
        if !self.is_enabled() {
            return;
        }
        self.entries().insert(key, CacheEntry::new(value));
    }

    pub fn delete(&self, key: &K) -> bool {
        let now = Instant::now();
        let removed = self.entries().remove(key);

        match removed {
            Some(entry) => {
                self.log_removed(key, RemovalReason::Deleted);
                entry.is_fresh(self.ttl, now)
            }
            None => false,
        }
    }

    /// Number of stored entries, expired ones included until they are touched
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log_removed(&self, key: &K, reason: RemovalReason) {
        if let Some(name) = &self.removal_log {
            info!("cache '{}' removed {:?}, reason {:?}", name, key, reason);
        }
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for TtlCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        TtlCache::get(self, key)
    }

    async fn set(&self, key: K, val: V) {
        TtlCache::set(self, key, val)
    }

    async fn delete(&self, key: &K) -> bool {
        TtlCache::delete(self, key)
    }
}

impl<K, V> Debug for TtlCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("entry_count", &self.len())
            .field("removal_log", &self.removal_log)
            .finish()
    }
}
