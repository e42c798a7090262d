use async_trait::async_trait;
use freeseats::ports::CacheStore;
use moka::future::Cache;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tracing::info;

/// Moka-based cache implementation with TTL support
/// Provides lock-free, concurrent cache with optional size bounds; a zero TTL disables it
pub struct MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    cache: Cache<K, V>,
    enabled: bool,
}

impl<K, V> MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    /// Create a Moka cache from name and optional capacity.
    /// With `log_removed` every eviction is logged with moka's removal cause.
    pub fn new(name: String, max_entries: Option<u64>, ttl: Duration, log_removed: bool) -> Self {
        let enabled = !ttl.is_zero();
        let mut builder = Cache::builder().name(&name);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        if enabled {
            builder = builder.time_to_live(ttl);
        }

        if log_removed {
            builder = builder.eviction_listener(move |key, _value, cause| {
                info!("cache '{}' removed {:?}, reason {:?}", name, key, cause);
            });
        }

        Self {
            cache: builder.build(),
            enabled,
        }
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        // None covers both "never inserted" and "TTL expired"
        self.cache.get(key).await
    }

    async fn set(&self, key: K, val: V) {
        if self.enabled {
            self.cache.insert(key, val).await;
        }
    }

    async fn delete(&self, key: &K) -> bool {
        self.cache.remove(key).await.is_some()
    }
}

impl<K, V> Debug for MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("enabled", &self.enabled)
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
