use crate::domain::SeatsLookup;
use async_trait::async_trait;
use shared::Result;

/// Seat operations exposed to request handlers
#[async_trait]
pub trait SeatOperations: Send + Sync + 'static {
    async fn get_free_seats(&self, bus_id: &str) -> Result<SeatsLookup>;

    /// Sell one ticket, returning the seats left afterwards
    async fn sell_ticket(&self, bus_id: &str) -> Result<i64>;
}
