pub mod db;
pub mod identity;
pub mod lobby;
pub mod relay;
pub mod server;
pub mod words;

pub use lobby::{RoomError, RoomService, RoomServiceFactory};
pub use relay::{RoomEvent, RoomEvents, StrokeEvent, StrokeKind};
