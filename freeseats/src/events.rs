use crate::domain::ChangeEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};

pub type Timestamp = DateTime<Utc>;

/// What a listener did to its cache, published for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheItemEvent {
    Updated(ItemUpdatedEvent),
    Invalidated(ItemInvalidatedEvent),
}

impl CacheItemEvent {
    pub fn backend(&self) -> usize {
        match self {
            CacheItemEvent::Updated(e) => e.backend,
            CacheItemEvent::Invalidated(e) => e.backend,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CacheItemEvent::Updated(e) => &e.key,
            CacheItemEvent::Invalidated(e) => &e.key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheItemEvent::Updated(_) => "updated",
            CacheItemEvent::Invalidated(_) => "invalidated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpdatedEvent {
    pub backend: usize,
    pub key: String,
    pub value: i64,
    pub sequence: u64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInvalidatedEvent {
    pub backend: usize,
    pub key: String,
    pub sequence: u64,
    pub timestamp: Timestamp,
}

/// JSON changefeed message in "updates" mode:
/// `{"key":["1"],"update":{"freeSeats":39}}` or `{"key":["1"],"erase":{}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CdcMessage {
    pub key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<CdcUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erase: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CdcUpdate {
    #[serde(rename = "freeSeats", default, skip_serializing_if = "Option::is_none")]
    pub free_seats: Option<i64>,
}

impl CdcMessage {
    pub fn update(key: impl Into<String>, free_seats: i64) -> Self {
        Self {
            key: vec![key.into()],
            update: Some(CdcUpdate {
                free_seats: Some(free_seats),
            }),
            erase: None,
        }
    }

    pub fn erase(key: impl Into<String>) -> Self {
        Self {
            key: vec![key.into()],
            update: None,
            erase: Some(serde_json::Value::Object(Default::default())),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::Internal(format!("Failed to encode changefeed message: {}", e)))
    }

    /// Decode a raw message into a change event at `sequence`.
    /// An update that does not carry the seat column yields `new_value: None`, forcing a re-read.
    pub fn decode(payload: &[u8], sequence: u64) -> Result<ChangeEvent> {
        let message: CdcMessage = serde_json::from_slice(payload)
            .map_err(|e| Error::Stream(format!("Failed to decode changefeed message: {}", e)))?;
        message.into_change_event(sequence)
    }

    pub fn into_change_event(self, sequence: u64) -> Result<ChangeEvent> {
        let key = self
            .key
            .into_iter()
            .next()
            .ok_or_else(|| Error::Stream("changefeed message without key".to_string()))?;

        let new_value = match (self.update, self.erase) {
            (_, Some(_)) => None,
            (Some(update), None) => update.free_seats,
            (None, None) => None,
        };

        Ok(ChangeEvent::new(key, new_value, sequence))
    }
}
