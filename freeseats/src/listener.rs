use crate::domain::{ChangeEvent, ListenerState};
use crate::events::{CacheItemEvent, ItemInvalidatedEvent, ItemUpdatedEvent};
use crate::ports::{CacheStore, ChangeFeed};
use chrono::Utc;
use shared::{Error, ListenerMode, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drains one change feed into one backend's cache.
///
/// Events are applied strictly in the order they are received and each one is acknowledged
/// only after its cache mutation is done. A broken or closed feed stops the listener with an
/// error; there is no resubscription.
pub struct ChangeFeedListener<F: ChangeFeed> {
    backend: usize,
    feed: F,
    cache: Arc<dyn CacheStore<String, i64>>,
    mode: ListenerMode,
    event_broadcaster: Option<broadcast::Sender<CacheItemEvent>>,
    state: ListenerState,
}

impl<F: ChangeFeed> ChangeFeedListener<F> {
    pub fn new(
        backend: usize,
        feed: F,
        cache: Arc<dyn CacheStore<String, i64>>,
        mode: ListenerMode,
    ) -> Self {
        Self {
            backend,
            feed,
            cache,
            mode,
            event_broadcaster: None,
            state: ListenerState::Listening,
        }
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CacheItemEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Apply a single change to the cache
    pub async fn apply(&self, event: &ChangeEvent) {
        let applied = match (self.mode, event.new_value) {
            (ListenerMode::DirectUpdate, Some(value)) => {
                self.cache.set(event.key.clone(), value).await;
                CacheItemEvent::Updated(ItemUpdatedEvent {
                    backend: self.backend,
                    key: event.key.clone(),
                    value,
                    sequence: event.sequence,
                    timestamp: Utc::now(),
                })
            }
            // erased rows carry no value, so even direct-update mode has to invalidate
            _ => {
                self.cache.delete(&event.key).await;
                CacheItemEvent::Invalidated(ItemInvalidatedEvent {
                    backend: self.backend,
                    key: event.key.clone(),
                    sequence: event.sequence,
                    timestamp: Utc::now(),
                })
            }
        };

        debug!(
            "backend {} applied {} for key '{}' at sequence {}",
            self.backend,
            applied.kind(),
            event.key,
            event.sequence
        );

        if let Some(ref broadcaster) = self.event_broadcaster {
            // no subscribers is the normal case
            let _ = broadcaster.send(applied);
        }
    }

    /// Receive, apply and acknowledge until the feed fails or `shutdown` fires
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Start cdc listen for backend {} in {:?} mode",
            self.backend, self.mode
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Change feed listener for backend {} shutting down", self.backend);
                    self.state = ListenerState::Terminated;
                    return Ok(());
                }
                next = self.feed.recv() => next,
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => {
                    return self.terminate(Error::Stream("change feed closed".to_string()));
                }
                Err(e) => return self.terminate(e),
            };

            self.apply(&event).await;

            if let Err(e) = self.feed.ack(event.sequence).await {
                return self.terminate(e);
            }
        }
    }

    fn terminate(&mut self, err: Error) -> Result<()> {
        error!("Change feed for backend {} failed: {}", self.backend, err);
        self.state = ListenerState::Terminated;
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays queued events, then either ends or fails.
    /// On every ack it records what the cache held for that key at that moment.
    struct ScriptedFeed {
        events: VecDeque<ChangeEvent>,
        fail_at_end: bool,
        cache: Arc<TtlCache<String, i64>>,
        last_key: Option<String>,
        acks: Arc<Mutex<Vec<(u64, Option<i64>)>>>,
    }

    #[async_trait]
    impl ChangeFeed for ScriptedFeed {
        async fn recv(&mut self) -> Result<Option<ChangeEvent>> {
            match self.events.pop_front() {
                Some(event) => {
                    self.last_key = Some(event.key.clone());
                    Ok(Some(event))
                }
                None if self.fail_at_end => Err(Error::Stream("connection reset".to_string())),
                None => Ok(None),
            }
        }

        async fn ack(&mut self, sequence: u64) -> Result<()> {
            let seen = self.last_key.as_ref().and_then(|key| self.cache.get(key));
            self.acks.lock().unwrap().push((sequence, seen));
            Ok(())
        }
    }

    struct IdleFeed;

    #[async_trait]
    impl ChangeFeed for IdleFeed {
        async fn recv(&mut self) -> Result<Option<ChangeEvent>> {
            std::future::pending().await
        }

        async fn ack(&mut self, _sequence: u64) -> Result<()> {
            Ok(())
        }
    }

    fn setup(
        events: Vec<ChangeEvent>,
        fail_at_end: bool,
        mode: ListenerMode,
    ) -> (
        ChangeFeedListener<ScriptedFeed>,
        Arc<TtlCache<String, i64>>,
        Arc<Mutex<Vec<(u64, Option<i64>)>>>,
    ) {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let acks = Arc::new(Mutex::new(Vec::new()));
        let feed = ScriptedFeed {
            events: events.into(),
            fail_at_end,
            cache: Arc::clone(&cache),
            last_key: None,
            acks: Arc::clone(&acks),
        };
        let listener = ChangeFeedListener::new(0, feed, cache.clone(), mode);
        (listener, cache, acks)
    }

    #[tokio::test]
    async fn test_direct_update_sets_value() {
        let (listener, cache, _) = setup(vec![], false, ListenerMode::DirectUpdate);
        cache.set("1".to_string(), 40);

        listener.apply(&ChangeEvent::new("1", Some(39), 1)).await;
        assert_eq!(cache.get(&"1".to_string()), Some(39));
    }

    #[tokio::test]
    async fn test_invalidate_drops_value() {
        let (listener, cache, _) = setup(vec![], false, ListenerMode::Invalidate);
        cache.set("1".to_string(), 40);

        listener.apply(&ChangeEvent::new("1", Some(39), 1)).await;
        assert_eq!(cache.get(&"1".to_string()), None);
    }

    #[tokio::test]
    async fn test_direct_update_without_value_invalidates() {
        let (listener, cache, _) = setup(vec![], false, ListenerMode::DirectUpdate);
        cache.set("1".to_string(), 40);

        listener.apply(&ChangeEvent::new("1", None, 1)).await;
        assert_eq!(cache.get(&"1".to_string()), None);
    }

    #[tokio::test]
    async fn test_acks_follow_application_in_order() {
        let events = vec![
            ChangeEvent::new("1", Some(39), 1),
            ChangeEvent::new("1", Some(38), 2),
            ChangeEvent::new("2A", Some(59), 3),
        ];
        let (mut listener, cache, acks) = setup(events, false, ListenerMode::DirectUpdate);

        let result = listener.run(CancellationToken::new()).await;

        // the scripted feed ends after three events, which is fatal
        assert!(matches!(result, Err(Error::Stream(_))));
        assert_eq!(listener.state(), ListenerState::Terminated);
        assert_eq!(
            *acks.lock().unwrap(),
            vec![(1, Some(39)), (2, Some(38)), (3, Some(59))]
        );
        assert_eq!(cache.get(&"1".to_string()), Some(38));
    }

    #[tokio::test]
    async fn test_stream_error_terminates() {
        let (mut listener, _, acks) = setup(
            vec![ChangeEvent::new("1", Some(39), 1)],
            true,
            ListenerMode::Invalidate,
        );

        let result = listener.run(CancellationToken::new()).await;
        match result {
            Err(Error::Stream(msg)) => assert_eq!(msg, "connection reset"),
            other => panic!("expected stream error, got {:?}", other),
        }
        assert_eq!(acks.lock().unwrap().len(), 1);
        assert_eq!(listener.state(), ListenerState::Terminated);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_listener() {
        let cache: Arc<TtlCache<String, i64>> = Arc::new(TtlCache::new(Duration::from_secs(1)));
        let mut listener = ChangeFeedListener::new(0, IdleFeed, cache, ListenerMode::Invalidate);
        assert_eq!(listener.state(), ListenerState::Listening);

        let token = CancellationToken::new();
        token.cancel();

        listener.run(token).await.unwrap();
        assert_eq!(listener.state(), ListenerState::Terminated);
    }

    #[tokio::test]
    async fn test_applied_events_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let (listener, _, _) = setup(vec![], false, ListenerMode::Invalidate);
        let listener = listener.with_event_broadcaster(tx);

        listener.apply(&ChangeEvent::new("2A", Some(10), 5)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "invalidated");
        assert_eq!(event.key(), "2A");
        assert_eq!(event.backend(), 0);
    }
}
