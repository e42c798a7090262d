use crate::state::Backend;
use freeseats::events::CacheItemEvent;
use freeseats::persistence::{SledChangeFeed, SledSeatStore};
use freeseats::planes::control::consumer_name;
use freeseats::{ChangeFeedListener, SeatService};
use shared::Result;
use shared::config::Config;
use std::sync::Arc;
use storage_engine::build_cache;
use tokio::sync::broadcast;
use tracing::info;

/// Build `config.backend_count` backends over one store.
///
/// With the change feed enabled every backend gets a listener subscribed under its own
/// consumer name; the caller decides where those run. Without it, each backend drops its own
/// cache entry after a sale instead.
pub fn build_backends(
    config: &Config,
    store: Arc<SledSeatStore>,
    events: &broadcast::Sender<CacheItemEvent>,
) -> Result<(Vec<Backend>, Vec<ChangeFeedListener<SledChangeFeed>>)> {
    let mut backends = Vec::with_capacity(config.backend_count);
    let mut listeners = Vec::new();

    for id in 0..config.backend_count {
        let cache = build_cache(
            config.cache_backend,
            &format!("backend-{}", id),
            config.cache_ttl,
            config.cache_log_removed,
        );

        let seats = SeatService::new(id, Arc::clone(&cache), store.clone())
            .with_invalidate_on_sell(!config.cdc_enabled);

        if config.cdc_enabled {
            let feed = SledChangeFeed::subscribe(&store, consumer_name(id))?;
            listeners.push(
                ChangeFeedListener::new(id, feed, cache, config.listener_mode)
                    .with_event_broadcaster(events.clone()),
            );
        }

        backends.push(Backend::new(id, seats));
    }

    info!(
        "servers count: {} (cdc {}, cache {})",
        backends.len(),
        if config.cdc_enabled { "enabled" } else { "disabled" },
        if config.cache_enabled() { "enabled" } else { "disabled" }
    );

    Ok((backends, listeners))
}
