use freeseats::SeatService;
use freeseats::events::CacheItemEvent;
use shared::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// One independent server instance: its own cache, its own change-feed consumer
#[derive(Clone, Debug)]
pub struct Backend {
    pub id: usize,
    pub seats: Arc<SeatService>,
}

impl Backend {
    pub fn new(id: usize, seats: SeatService) -> Self {
        Self {
            id,
            seats: Arc::new(seats),
        }
    }
}

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    backends: Arc<Vec<Backend>>,
    next_backend: Arc<AtomicUsize>,
    pub event_channel: broadcast::Sender<CacheItemEvent>,
}

impl AppState {
    pub fn new(
        backends: Vec<Backend>,
        event_channel: broadcast::Sender<CacheItemEvent>,
    ) -> Result<Self> {
        if backends.is_empty() {
            return Err(Error::Internal("at least one backend is required".to_string()));
        }

        Ok(Self {
            backends: Arc::new(backends),
            next_backend: Arc::new(AtomicUsize::new(0)),
            event_channel,
        })
    }

    /// Round-robin over the backends
    pub fn pick_backend(&self) -> &Backend {
        let n = self.next_backend.fetch_add(1, Ordering::Relaxed);
        &self.backends[n % self.backends.len()]
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeseats::TtlCache;
    use freeseats::persistence::SledSeatStore;
    use std::time::Duration;

    fn backend(id: usize, store: &Arc<SledSeatStore>) -> Backend {
        let cache: Arc<TtlCache<String, i64>> = Arc::new(TtlCache::new(Duration::from_secs(1)));
        Backend::new(id, SeatService::new(id, cache, store.clone()))
    }

    #[test]
    fn test_round_robin() {
        let store = Arc::new(SledSeatStore::temporary().unwrap());
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(
            vec![backend(0, &store), backend(1, &store), backend(2, &store)],
            tx,
        )
        .unwrap();

        let picked: Vec<usize> = (0..5).map(|_| state.pick_backend().id).collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_requires_a_backend() {
        let (tx, _) = broadcast::channel(4);
        assert!(matches!(AppState::new(vec![], tx), Err(Error::Internal(_))));
    }
}
