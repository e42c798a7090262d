#![deny(clippy::all)]

use crate::domain::ChangeEvent;
use async_trait::async_trait;
use shared::Result;

// Ports are the pluggable extension points for the cache, the backing store and the change feed

/// Port for an in-memory cache in front of the backing store.
/// None of the operations can fail; they never perform I/O.
#[async_trait]
pub trait CacheStore<K, V>: Send + Sync + 'static {
    /// Returns `None` for a missing or expired entry
    async fn get(&self, key: &K) -> Option<V>;
    async fn set(&self, key: K, val: V);
    /// Returns whether a live entry was removed
    async fn delete(&self, key: &K) -> bool;
}

/// Business logic run inside a store transaction: current value in, new value (or an abort reason) out
pub type SeatUpdate<'a> = &'a (dyn Fn(Option<i64>) -> Result<i64> + Send + Sync);

/// Port for the transactional store of record
#[async_trait]
pub trait SeatStore: Send + Sync + 'static {
    async fn read(&self, key: &str) -> Result<Option<i64>>;

    /// Read the current value for `key`, hand it to `update` and write the result, all in one
    /// transaction. An `Err` from `update` aborts the transaction and is returned as is.
    /// The store may run `update` more than once when it retries a conflicting transaction.
    async fn update_in_transaction(&self, key: &str, update: SeatUpdate<'_>) -> Result<i64>;

    async fn upsert(&self, key: &str, value: i64) -> Result<()>;

    /// Remove every row
    async fn clear(&self) -> Result<()>;
}

/// Port for a sequential change-notification stream
#[async_trait]
pub trait ChangeFeed: Send + Sync + 'static {
    /// Wait for the next event. `Ok(None)` means the stream ended.
    async fn recv(&mut self) -> Result<Option<ChangeEvent>>;

    /// Advance the durable consumption position past `sequence`
    async fn ack(&mut self, sequence: u64) -> Result<()>;
}
