pub mod moka_cache;

pub use moka_cache::MokaCache;

use freeseats::TtlCache;
use freeseats::ports::CacheStore;
use shared::CacheBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the cache a backend reads through
pub fn build_cache(
    backend: CacheBackend,
    name: &str,
    ttl: Duration,
    log_removed: bool,
) -> Arc<dyn CacheStore<String, i64>> {
    info!("Creating {:?} cache '{}' with ttl {:?}", backend, name, ttl);

    match backend {
        CacheBackend::Ttl => {
            let cache = TtlCache::<String, i64>::new(ttl);
            if log_removed {
                Arc::new(cache.with_removal_log(name))
            } else {
                Arc::new(cache)
            }
        }
        CacheBackend::Moka => Arc::new(MokaCache::<String, i64>::new(
            name.to_string(),
            None,
            ttl,
            log_removed,
        )),
    }
}
