use crate::domain::{SeatsLookup, SeatsSource};
use crate::planes::data::operation::SeatOperations;
use crate::ports::{CacheStore, SeatStore};
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

pub const NOT_ENOUGH_FREE_SEATS: &str = "not enough free seats";

/// The guarded decrement run inside the store transaction
pub fn take_one_seat(current: Option<i64>) -> Result<i64> {
    match current {
        None => Err(Error::NotFound),
        Some(free) if free < 1 => Err(Error::Conflict(NOT_ENOUGH_FREE_SEATS.to_string())),
        Some(free) => Ok(free - 1),
    }
}

/// Per-backend entry point for seat reads and sales.
///
/// Reads go through the backend's cache. Sales go straight to the store; the change feed is
/// what brings the cache back in line, unless `invalidate_on_sell` is set for deployments
/// running without one.
#[derive(Clone)]
pub struct SeatService {
    backend: usize,
    cache: Arc<dyn CacheStore<String, i64>>,
    store: Arc<dyn SeatStore>,
    invalidate_on_sell: bool,
    store_reads: Arc<AtomicU64>,
}

impl SeatService {
    pub fn new(
        backend: usize,
        cache: Arc<dyn CacheStore<String, i64>>,
        store: Arc<dyn SeatStore>,
    ) -> Self {
        Self {
            backend,
            cache,
            store,
            invalidate_on_sell: false,
            store_reads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_invalidate_on_sell(mut self, invalidate: bool) -> Self {
        self.invalidate_on_sell = invalidate;
        self
    }

    /// How many lookups missed the cache and went to the store
    pub fn store_reads(&self) -> u64 {
        self.store_reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SeatOperations for SeatService {
    async fn get_free_seats(&self, bus_id: &str) -> Result<SeatsLookup> {
        let key = bus_id.to_string();

        if let Some(free_seats) = self.cache.get(&key).await {
            return Ok(SeatsLookup::new(free_seats, SeatsSource::Cache));
        }

        self.store_reads.fetch_add(1, Ordering::Relaxed);
        let free_seats = self.store.read(bus_id).await?.ok_or(Error::NotFound)?;

        debug!(
            "backend {} store cache for bus '{}' ({})",
            self.backend, bus_id, free_seats
        );
        self.cache.set(key, free_seats).await;

        Ok(SeatsLookup::new(free_seats, SeatsSource::Store))
    }

    async fn sell_ticket(&self, bus_id: &str) -> Result<i64> {
        let left = self
            .store
            .update_in_transaction(bus_id, &take_one_seat)
            .await?;

        info!(
            "backend {} sold a ticket for bus '{}', {} left",
            self.backend, bus_id, left
        );

        if self.invalidate_on_sell {
            self.cache.delete(&bus_id.to_string()).await;
        }

        Ok(left)
    }
}

impl std::fmt::Debug for SeatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatService")
            .field("backend", &self.backend)
            .field("invalidate_on_sell", &self.invalidate_on_sell)
            .field("store_reads", &self.store_reads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::persistence::SledSeatStore;
    use std::time::Duration;

    fn service_with(seats: &[(&str, i64)]) -> (SeatService, Arc<SledSeatStore>) {
        let store = Arc::new(SledSeatStore::temporary().unwrap());
        for (bus, free) in seats {
            store.put(bus, *free).unwrap();
        }
        let cache: Arc<TtlCache<String, i64>> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        (SeatService::new(0, cache, store.clone()), store)
    }

    #[test]
    fn test_take_one_seat() {
        assert_eq!(take_one_seat(Some(40)).unwrap(), 39);
        assert_eq!(take_one_seat(Some(1)).unwrap(), 0);
        assert!(matches!(take_one_seat(Some(0)), Err(Error::Conflict(_))));
        assert!(matches!(take_one_seat(Some(-3)), Err(Error::Conflict(_))));
        assert!(matches!(take_one_seat(None), Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_sell_decrements_store() {
        let (service, store) = service_with(&[("1", 40)]);

        assert_eq!(service.sell_ticket("1").await.unwrap(), 39);
        assert_eq!(store.get("1").unwrap(), Some(39));
    }

    #[tokio::test]
    async fn test_sell_on_empty_bus_conflicts_and_keeps_value() {
        let (service, store) = service_with(&[("1", 0)]);

        let result = service.sell_ticket("1").await;
        match result {
            Err(Error::Conflict(msg)) => assert_eq!(msg, NOT_ENOUGH_FREE_SEATS),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(store.get("1").unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_sell_unknown_bus() {
        let (service, store) = service_with(&[]);

        assert!(matches!(service.sell_ticket("404").await, Err(Error::NotFound)));
        assert_eq!(store.get("404").unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_reads_store_once_then_cache() {
        let (service, _) = service_with(&[("2A", 60)]);

        let first = service.get_free_seats("2A").await.unwrap();
        assert_eq!(first, SeatsLookup::new(60, SeatsSource::Store));

        let second = service.get_free_seats("2A").await.unwrap();
        assert!(second.cached());
        assert_eq!(second.free_seats, 60);
        assert_eq!(service.store_reads(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_bus_is_not_cached() {
        let (service, _) = service_with(&[]);

        assert!(matches!(service.get_free_seats("x").await, Err(Error::NotFound)));
        assert!(matches!(service.get_free_seats("x").await, Err(Error::NotFound)));
        assert_eq!(service.store_reads(), 2);
    }

    #[tokio::test]
    async fn test_sell_leaves_cache_alone_by_default() {
        let (service, _) = service_with(&[("1", 40)]);
        service.get_free_seats("1").await.unwrap();

        service.sell_ticket("1").await.unwrap();

        // stale until the change feed catches up
        let lookup = service.get_free_seats("1").await.unwrap();
        assert_eq!(lookup, SeatsLookup::new(40, SeatsSource::Cache));
    }

    #[tokio::test]
    async fn test_sell_invalidates_when_configured() {
        let (service, _) = service_with(&[("1", 40)]);
        let service = service.with_invalidate_on_sell(true);
        service.get_free_seats("1").await.unwrap();

        service.sell_ticket("1").await.unwrap();

        let lookup = service.get_free_seats("1").await.unwrap();
        assert_eq!(lookup, SeatsLookup::new(39, SeatsSource::Store));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_of_last_seat() {
        let (service, store) = service_with(&[("1", 1)]);

        let a = tokio::spawn({
            let service = service.clone();
            async move { service.sell_ticket("1").await }
        });
        let b = tokio::spawn({
            let service = service.clone();
            async move { service.sell_ticket("1").await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let sold: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Conflict(_))))
            .count();

        assert_eq!(sold, vec![&0]);
        assert_eq!(conflicts, 1);
        assert_eq!(store.get("1").unwrap(), Some(0));
    }
}
