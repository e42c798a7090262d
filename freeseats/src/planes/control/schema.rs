use crate::ports::SeatStore;
use shared::Result;
use tracing::info;

/// Rows every fresh deployment starts with
pub const DEFAULT_BUSES: &[(&str, i64)] = &[("1", 40), ("2A", 60)];

/// Change-feed consumer name for a backend
pub fn consumer_name(backend: usize) -> String {
    format!("consumer-{}", backend)
}

/// Reset the bus table to `rows`
pub async fn init_schema(store: &dyn SeatStore, rows: &[(&str, i64)]) -> Result<()> {
    store.clear().await?;

    for (bus_id, free_seats) in rows {
        store.upsert(bus_id, *free_seats).await?;
    }

    info!("Bus table initialized with {} row(s)", rows.len());
    Ok(())
}
