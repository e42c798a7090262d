use crate::state::AppState;
use axum::{
    extract::State,
    http::Uri,
    response::sse::{Event, KeepAlive, Sse},
};
use freeseats::events::CacheItemEvent;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventFilter {
    backend: Vec<usize>,
    event_type: Vec<String>,
}

impl EventFilter {
    /// Parse query string with CSV support for multiple values
    /// Examples: ?backend=0,1&type=updated,invalidated
    fn from_query_string(query: &str) -> Self {
        let mut filter = Self::default();

        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                match key {
                    "backend" => {
                        filter.backend.extend(
                            value
                                .split(',')
                                .filter_map(|s| s.trim().parse::<usize>().ok()),
                        );
                    }
                    "type" => {
                        filter
                            .event_type
                            .extend(value.split(',').map(|s| s.trim().to_string()));
                    }
                    _ => {}
                }
            }
        }

        filter
    }

    /// Check if an event should be sent based on the filter criteria
    fn matches(&self, event: &CacheItemEvent) -> bool {
        if !self.backend.is_empty() && !self.backend.contains(&event.backend()) {
            return false;
        }

        if !self.event_type.is_empty() && !self.event_type.iter().any(|t| t == event.kind()) {
            return false;
        }

        true
    }
}

/// SSE endpoint that streams what the change-feed listeners did to their caches
pub async fn stream_events(
    State(state): State<AppState>,
    uri: Uri,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = uri
        .query()
        .map(EventFilter::from_query_string)
        .unwrap_or_default();

    tracing::info!(
        "New SSE client connected. Filters: backend={:?}, type={:?}",
        filter.backend,
        filter.event_type
    );

    let stream = BroadcastStream::new(state.event_channel.subscribe());

    let filtered_stream = stream.filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) if filter.matches(&event) => Some(Ok(to_sse_event(event))),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(n)) => Some(Ok(Event::default()
                    .event("error")
                    .data(format!("Lagged by {} events", n)))),
            }
        }
    });

    Sse::new(filtered_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert a CacheItemEvent to an SSE Event
fn to_sse_event(event: CacheItemEvent) -> Event {
    let name = format!("item.{}", event.kind());
    Event::default()
        .event(&name)
        .json_data(&event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
