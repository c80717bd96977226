//! Server-sent events endpoint for room subscriptions.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::lobby::types::RoomId;
use crate::relay::watcher::{RoomEvent, RoomEvents};

const LOG_TARGET: &str = "server::stream";

const KEEP_ALIVE_SECS: u64 = 15;

/// Subscribes to a room and adapts its broadcast channel into an SSE
/// stream. Lagged subscribers simply miss events; the next snapshot
/// refetch catches them up.
pub fn room_event_stream(
    events: &Arc<RoomEvents>,
    room_id: RoomId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = events.subscribe(room_id);
    let stream = BroadcastStream::new(rx).filter_map(move |item| async move {
        match item {
            Ok(event) => Some(Ok(encode_event(event))),
            Err(err) => {
                debug!(target = LOG_TARGET, %room_id, error = %err, "subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

fn encode_event(event: RoomEvent) -> Event {
    let name = event.name();
    match serde_json::to_string(&event) {
        Ok(data) => Event::default().event(name).data(data),
        Err(err) => {
            debug!(target = LOG_TARGET, error = %err, "failed to encode event");
            Event::default().event("error").data("encoding failure")
        }
    }
}
