use std::time::Duration;
use tokio::time::Instant;

/// A cached value together with the moment it was last written
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// An entry is valid only while its age is strictly below `ttl`
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// One row-level change observed on the backing store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    /// Post-change value; `None` when the row was erased
    pub new_value: Option<i64>,
    /// Position in the feed, handed back on acknowledgment
    pub sequence: u64,
}

impl ChangeEvent {
    pub fn new(key: impl Into<String>, new_value: Option<i64>, sequence: u64) -> Self {
        Self {
            key: key.into(),
            new_value,
            sequence,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Listening,
    Terminated,
}

/// Where a free-seats answer came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatsSource {
    Cache,
    Store,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatsLookup {
    pub free_seats: i64,
    pub source: SeatsSource,
}

impl SeatsLookup {
    pub fn new(free_seats: i64, source: SeatsSource) -> Self {
        Self { free_seats, source }
    }

    pub fn cached(&self) -> bool {
        self.source == SeatsSource::Cache
    }
}
