pub mod feed;
pub mod realtime;
pub mod stroke;
pub mod watcher;

pub use feed::{ChangeFeed, ChangeOp, ChangeTable, TableChange};
pub use stroke::{StrokeEvent, StrokeKind};
pub use watcher::{RoomEvent, RoomEvents, RoomWatcher};
