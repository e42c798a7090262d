use crate::ports::{SeatStore, SeatUpdate};
use async_trait::async_trait;
use shared::{Error, Result};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult,
};
use std::path::Path;

pub const BUS_TREE: &str = "bus";
pub const OFFSETS_TREE: &str = "cdc_offsets";

/// Sled-backed store of record: one row per bus, free seats as a big-endian i64
#[derive(Clone)]
pub struct SledSeatStore {
    db: sled::Db,
    bus: sled::Tree,
}

impl SledSeatStore {
    /// Open (or create) the store at `path`
    /// Creates the parent directory if it doesn't exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Store(format!("Failed to open Sled database: {}", e)))?;

        Self::from_db(db)
    }

    /// A store that is deleted when the last handle is dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| Error::Store(format!("Failed to open Sled database: {}", e)))?;

        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let bus = db
            .open_tree(BUS_TREE)
            .map_err(|e| Error::Store(format!("Failed to open tree '{}': {}", BUS_TREE, e)))?;

        Ok(Self { db, bus })
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub fn bus_tree(&self) -> &sled::Tree {
        &self.bus
    }

    pub fn get(&self, key: &str) -> Result<Option<i64>> {
        let value = self
            .bus
            .get(key.as_bytes())
            .map_err(|e| Error::Store(format!("Failed to read bus '{}': {}", key, e)))?;

        value.map(|bytes| decode_seats(&bytes)).transpose()
    }

    pub fn put(&self, key: &str, value: i64) -> Result<()> {
        self.bus
            .insert(key.as_bytes(), encode_seats(value).to_vec())
            .map_err(|e| Error::Store(format!("Failed to write bus '{}': {}", key, e)))?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| Error::Store(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SeatStore for SledSeatStore {
    async fn read(&self, key: &str) -> Result<Option<i64>> {
        self.get(key)
    }

    async fn update_in_transaction(&self, key: &str, update: SeatUpdate<'_>) -> Result<i64> {
        // sled reruns the closure on conflicting concurrent transactions
        let result: TransactionResult<i64, Error> =
            self.bus
                .transaction(|tx| -> ConflictableTransactionResult<i64, Error> {
                    let current = match tx.get(key.as_bytes())? {
                        Some(bytes) => Some(
                            decode_seats(&bytes).map_err(ConflictableTransactionError::Abort)?,
                        ),
                        None => None,
                    };

                    let next = update(current).map_err(ConflictableTransactionError::Abort)?;
                    tx.insert(key.as_bytes(), encode_seats(next).to_vec())?;
                    Ok(next)
                });

        match result {
            Ok(next) => Ok(next),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Store(format!(
                "Transaction on bus '{}' failed: {}",
                key, e
            ))),
        }
    }

    async fn upsert(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, value)
    }

    async fn clear(&self) -> Result<()> {
        self.bus
            .clear()
            .map_err(|e| Error::Store(format!("Failed to clear '{}': {}", BUS_TREE, e)))
    }
}

pub(crate) fn encode_seats(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

pub(crate) fn decode_seats(bytes: &[u8]) -> Result<i64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Store(format!("Corrupt seat count ({} bytes)", bytes.len())))?;
    Ok(i64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sled_store_put_and_get() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("seats.sled");

        let store = SledSeatStore::new(&db_path).unwrap();
        assert_eq!(store.get("1").unwrap(), None);

        store.put("1", 40).unwrap();
        store.flush().unwrap();
        assert_eq!(store.get("1").unwrap(), Some(40));
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        assert!(matches!(decode_seats(&[1, 2, 3]), Err(Error::Store(_))));
        assert_eq!(decode_seats(&encode_seats(-5)).unwrap(), -5);
    }

    #[tokio::test]
    async fn test_transaction_abort_leaves_row_untouched() {
        let store = SledSeatStore::temporary().unwrap();
        store.put("1", 3).unwrap();

        let rejected = store
            .update_in_transaction("1", &|_| Err(Error::Conflict("nope".to_string())))
            .await;
        assert!(matches!(rejected, Err(Error::Conflict(_))));
        assert_eq!(store.get("1").unwrap(), Some(3));

        let next = store
            .update_in_transaction("1", &|current| Ok(current.unwrap_or(0) + 10))
            .await
            .unwrap();
        assert_eq!(next, 13);
        assert_eq!(store.get("1").unwrap(), Some(13));
    }

    #[tokio::test]
    async fn test_clear_removes_rows() {
        let store = SledSeatStore::temporary().unwrap();
        store.upsert("1", 40).await.unwrap();
        store.upsert("2A", 60).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.read("1").await.unwrap(), None);
        assert_eq!(store.read("2A").await.unwrap(), None);
    }
}
