//! Per-room event fan-out.
//!
//! A single watcher task consumes the [`ChangeFeed`] and turns raw row
//! changes into room-scoped events. Roster and guess changes trigger a
//! refetch from the store so subscribers always receive a consistent
//! snapshot, while strokes are relayed straight through.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::lobby::storage::RoomStore;
use crate::lobby::types::{GuessView, RoomId, RoomWithPlayers};

use super::feed::{ChangeFeed, ChangeOp, ChangeTable, TableChange};
use super::stroke::StrokeEvent;

const LOG_TARGET: &str = "relay::watcher";

/// Events delivered to clients subscribed to a room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    Room(RoomWithPlayers),
    Guesses(Vec<GuessView>),
    Stroke(StrokeEvent),
    CanvasCleared,
    RoomClosed,
}

impl RoomEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Room(_) => "room",
            RoomEvent::Guesses(_) => "guesses",
            RoomEvent::Stroke(_) => "stroke",
            RoomEvent::CanvasCleared => "canvas_cleared",
            RoomEvent::RoomClosed => "room_closed",
        }
    }
}

const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Registry of per-room broadcast channels.
#[derive(Default)]
pub struct RoomEvents {
    channels: DashMap<RoomId, broadcast::Sender<RoomEvent>>,
}

impl RoomEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<RoomEvent> {
        self.channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Whether anyone is currently listening on the room.
    pub fn has_listeners(&self, room_id: RoomId) -> bool {
        self.channels
            .get(&room_id)
            .map(|tx| tx.receiver_count() > 0)
            .unwrap_or(false)
    }

    pub fn publish(&self, room_id: RoomId, event: RoomEvent) {
        let stale = match self.channels.get(&room_id) {
            Some(tx) if tx.receiver_count() > 0 => {
                let _ = tx.send(event);
                false
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            self.channels.remove_if(&room_id, |_, tx| tx.receiver_count() == 0);
        }
    }
}

pub struct RoomWatcher {
    store: Arc<dyn RoomStore>,
    events: Arc<RoomEvents>,
    stop: CancellationToken,
}

impl RoomWatcher {
    pub fn new(
        store: Arc<dyn RoomStore>,
        events: Arc<RoomEvents>,
        stop: CancellationToken,
    ) -> Self {
        Self { store, events, stop }
    }

    /// Runs the watcher on a background task until cancelled.
    pub fn spawn(self, mut feed: broadcast::Receiver<TableChange>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.stop.cancelled() => {
                        debug!(target = LOG_TARGET, "watcher stopped");
                        break;
                    }
                    change = feed.recv() => {
                        match change {
                            Ok(change) => self.handle(change).await,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(target = LOG_TARGET, skipped, "change feed lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!(target = LOG_TARGET, "change feed closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    async fn handle(&self, change: TableChange) {
        let Some(room_id) = change.room_id else {
            return;
        };
        if !self.events.has_listeners(room_id) {
            return;
        }

        match (change.table, change.op) {
            (ChangeTable::Rooms, ChangeOp::Delete) => {
                self.events.publish(room_id, RoomEvent::RoomClosed);
            }
            (ChangeTable::Rooms, _) | (ChangeTable::RoomPlayers, _) => {
                self.refresh_room(room_id).await;
            }
            (ChangeTable::Guesses, ChangeOp::Insert) => {
                match self.store.load_guesses(room_id).await {
                    Ok(guesses) => self.events.publish(room_id, RoomEvent::Guesses(guesses)),
                    Err(err) => {
                        warn!(target = LOG_TARGET, %room_id, error = %err, "failed to refetch guesses");
                    }
                }
            }
            (ChangeTable::DrawingStrokes, ChangeOp::Insert) => {
                match parse_stroke(&change.row) {
                    Some(stroke) => self.events.publish(room_id, RoomEvent::Stroke(stroke)),
                    None => {
                        warn!(target = LOG_TARGET, %room_id, "dropping malformed stroke row");
                    }
                }
            }
            (ChangeTable::DrawingStrokes, ChangeOp::Delete) => {
                self.events.publish(room_id, RoomEvent::CanvasCleared);
            }
            _ => {}
        }
    }

    async fn refresh_room(&self, room_id: RoomId) {
        match self.store.load_room_with_players(room_id).await {
            Ok(Some(view)) => self.events.publish(room_id, RoomEvent::Room(view)),
            Ok(None) => self.events.publish(room_id, RoomEvent::RoomClosed),
            Err(err) => {
                warn!(target = LOG_TARGET, %room_id, error = %err, "failed to refetch room");
            }
        }
    }
}

/// Pulls the stroke payload out of a `drawing_strokes` row.
fn parse_stroke(row: &serde_json::Value) -> Option<StrokeEvent> {
    let payload = row.get("stroke_data")?;
    serde_json::from_value(payload.clone()).ok()
}

/// Convenience used by server bootstrap: wires a watcher to a feed.
pub fn spawn_watcher(
    store: Arc<dyn RoomStore>,
    feed: &ChangeFeed,
    events: Arc<RoomEvents>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    RoomWatcher::new(store, events, stop).spawn(feed.subscribe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::service::{RoomService, RoomServiceFactory};
    use crate::lobby::storage::InMemoryRoomStore;
    use crate::relay::stroke::StrokeKind;

    async fn setup() -> (RoomServiceFactory, Arc<RoomEvents>, JoinHandle<()>) {
        let feed = ChangeFeed::default();
        let store = Arc::new(InMemoryRoomStore::new(feed.clone()));
        let events = Arc::new(RoomEvents::new());
        let handle = spawn_watcher(
            store.clone(),
            &feed,
            events.clone(),
            CancellationToken::new(),
        );
        (RoomServiceFactory::new(store), events, handle)
    }

    #[tokio::test]
    async fn strokes_are_relayed_to_room_subscribers() {
        let (service, events, _handle) = setup().await;
        let host = service.create_anonymous_user().await.expect("user");
        let room = service.create_room(host.id, true).await.expect("room");

        let mut rx = events.subscribe(room.id);
        let stroke = StrokeEvent {
            kind: StrokeKind::Start,
            x: Some(10.0),
            y: Some(20.0),
            color: Some("#000000".into()),
            size: Some(4.0),
            tool: Some("pen".into()),
        };
        service
            .save_stroke(room.id, host.id, stroke.clone())
            .await
            .expect("stroke saved");

        // Roster refreshes from room creation may still be in flight.
        loop {
            match rx.recv().await.expect("event") {
                RoomEvent::Stroke(seen) => {
                    assert_eq!(seen, stroke);
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn clearing_the_canvas_notifies_subscribers() {
        let (service, events, _handle) = setup().await;
        let host = service.create_anonymous_user().await.expect("user");
        let room = service.create_room(host.id, true).await.expect("room");

        let mut rx = events.subscribe(room.id);
        service.clear_canvas(room.id).await.expect("cleared");

        loop {
            match rx.recv().await.expect("event") {
                RoomEvent::CanvasCleared => break,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn guess_inserts_push_the_full_guess_list() {
        let (service, events, _handle) = setup().await;
        let host = service.create_anonymous_user().await.expect("host");
        let guesser = service.create_anonymous_user().await.expect("guesser");
        let room = service.create_room(host.id, true).await.expect("room");
        service
            .join_room_by_code(&room.code, guesser.id)
            .await
            .expect("joined");

        let mut rx = events.subscribe(room.id);
        service
            .submit_guess(room.id, guesser.id, "wrong answer")
            .await
            .expect("guess recorded");

        // Roster updates may interleave; wait for the guess list.
        loop {
            match rx.recv().await.expect("event") {
                RoomEvent::Guesses(guesses) => {
                    assert_eq!(guesses.len(), 1);
                    assert_eq!(guesses[0].guess.guess, "wrong answer");
                    assert!(!guesses[0].guess.is_correct);
                    break;
                }
                _ => continue,
            }
        }
    }
}
