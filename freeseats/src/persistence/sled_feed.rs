use super::sled_store::{OFFSETS_TREE, SledSeatStore, decode_seats};
use crate::domain::ChangeEvent;
use crate::ports::ChangeFeed;
use async_trait::async_trait;
use shared::{Error, Result};
use tokio::sync::Mutex;
use tracing::debug;

/// Change feed over the bus tree of a [`SledSeatStore`].
///
/// Subscribes from "now": writes committed before `subscribe` are not replayed. Each consumer
/// keeps its acknowledged sequence in the offsets tree under its own name.
pub struct SledChangeFeed {
    consumer: String,
    // sled's subscriber is not Sync; only `recv` touches it, through `get_mut`
    subscriber: Mutex<sled::Subscriber>,
    offsets: sled::Tree,
    next_sequence: u64,
}

impl SledChangeFeed {
    pub fn subscribe(store: &SledSeatStore, consumer: impl Into<String>) -> Result<Self> {
        let consumer = consumer.into();
        let offsets = store
            .db()
            .open_tree(OFFSETS_TREE)
            .map_err(|e| Error::Stream(format!("Failed to open offsets for '{}': {}", consumer, e)))?;

        let committed = read_offset(&offsets, &consumer)?.unwrap_or(0);
        let subscriber = store.bus_tree().watch_prefix(Vec::new());

        debug!(
            "consumer '{}' subscribed, last committed sequence {}",
            consumer, committed
        );

        Ok(Self {
            consumer,
            subscriber: Mutex::new(subscriber),
            offsets,
            next_sequence: committed + 1,
        })
    }

    /// Last sequence this consumer acknowledged
    pub fn committed(&self) -> Result<Option<u64>> {
        read_offset(&self.offsets, &self.consumer)
    }
}

#[async_trait]
impl ChangeFeed for SledChangeFeed {
    async fn recv(&mut self) -> Result<Option<ChangeEvent>> {
        let event = match self.subscriber.get_mut().await {
            Some(event) => event,
            None => return Ok(None),
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let change = match event {
            sled::Event::Insert { key, value } => {
                let seats = decode_seats(&value).map_err(|e| Error::Stream(e.to_string()))?;
                ChangeEvent::new(key_to_string(&key)?, Some(seats), sequence)
            }
            sled::Event::Remove { key } => ChangeEvent::new(key_to_string(&key)?, None, sequence),
        };

        Ok(Some(change))
    }

    async fn ack(&mut self, sequence: u64) -> Result<()> {
        self.offsets
            .insert(self.consumer.as_bytes(), sequence.to_be_bytes().to_vec())
            .map_err(|e| {
                Error::Stream(format!(
                    "Failed to commit offset {} for '{}': {}",
                    sequence, self.consumer, e
                ))
            })?;
        Ok(())
    }
}

fn key_to_string(key: &[u8]) -> Result<String> {
    String::from_utf8(key.to_vec())
        .map_err(|e| Error::Stream(format!("Non UTF-8 bus id in change feed: {}", e)))
}

fn read_offset(offsets: &sled::Tree, consumer: &str) -> Result<Option<u64>> {
    let raw = offsets
        .get(consumer.as_bytes())
        .map_err(|e| Error::Stream(format!("Failed to read offset for '{}': {}", consumer, e)))?;

    match raw {
        Some(bytes) => {
            let raw = <[u8; 8]>::try_from(&bytes[..]).map_err(|_| {
                Error::Stream(format!("Corrupt offset for consumer '{}'", consumer))
            })?;
            Ok(Some(u64::from_be_bytes(raw)))
        }
        None => Ok(None),
    }
}
