//! In-process change feed.
//!
//! Every mutation to game state ends up here as a [`TableChange`],
//! whether it was performed locally against the in-memory store or
//! observed on the Postgres replication stream via the realtime
//! websocket. Room watchers subscribe to the feed and fan events out
//! per room.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Users,
    Rooms,
    RoomPlayers,
    Guesses,
    DrawingStrokes,
}

impl ChangeTable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "users" => Some(Self::Users),
            "rooms" => Some(Self::Rooms),
            "room_players" => Some(Self::RoomPlayers),
            "guesses" => Some(Self::Guesses),
            "drawing_strokes" => Some(Self::DrawingStrokes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One observed row change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub table: ChangeTable,
    pub op: ChangeOp,
    /// Room the change belongs to, when the row carries one.
    pub room_id: Option<Uuid>,
    /// The new row for inserts and updates, the old row for deletes.
    pub row: serde_json::Value,
}

/// Clonable publish handle over a broadcast channel. Publishing with no
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<TableChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, change: TableChange) {
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_published_changes() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        let change = TableChange {
            table: ChangeTable::Guesses,
            op: ChangeOp::Insert,
            room_id: Some(Uuid::new_v4()),
            row: serde_json::json!({ "guess": "cat" }),
        };
        feed.publish(change.clone());
        let seen = rx.recv().await.expect("change delivered");
        assert_eq!(seen, change);
    }

    #[test]
    fn table_names_map_to_variants() {
        assert_eq!(ChangeTable::from_name("rooms"), Some(ChangeTable::Rooms));
        assert_eq!(
            ChangeTable::from_name("drawing_strokes"),
            Some(ChangeTable::DrawingStrokes)
        );
        assert_eq!(ChangeTable::from_name("unknown"), None);
    }
}
