use crate::domain::ChangeEvent;
use crate::events::CdcMessage;
use crate::ports::ChangeFeed;
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Producer side of a [`ChannelChangeFeed`]
#[derive(Clone, Debug)]
pub struct ChangePublisher {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChangePublisher {
    pub async fn publish(&self, message: &CdcMessage) -> Result<()> {
        self.publish_raw(message.encode()?).await
    }

    pub async fn publish_raw(&self, payload: Vec<u8>) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| Error::Stream("change feed consumer is gone".to_string()))
    }
}

/// Change feed fed with raw JSON changefeed messages over an in-process channel.
/// A message that does not decode breaks the feed.
pub struct ChannelChangeFeed {
    rx: mpsc::Receiver<Vec<u8>>,
    next_sequence: u64,
    committed: Arc<AtomicU64>,
}

impl ChannelChangeFeed {
    pub fn channel(buffer: usize) -> (ChangePublisher, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        let feed = Self {
            rx,
            next_sequence: 1,
            committed: Arc::new(AtomicU64::new(0)),
        };
        (ChangePublisher { tx }, feed)
    }

    /// Shared view of the acknowledged position, readable after the feed moves into a listener
    pub fn committed_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.committed)
    }
}

#[async_trait]
impl ChangeFeed for ChannelChangeFeed {
    async fn recv(&mut self) -> Result<Option<ChangeEvent>> {
        let Some(payload) = self.rx.recv().await else {
            return Ok(None);
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        CdcMessage::decode(&payload, sequence).map(Some)
    }

    async fn ack(&mut self, sequence: u64) -> Result<()> {
        self.committed.store(sequence, Ordering::Release);
        Ok(())
    }
}
