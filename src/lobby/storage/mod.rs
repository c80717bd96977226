use async_trait::async_trait;

use crate::relay::feed::ChangeFeed;

use super::error::RoomError;
use super::types::{
    GuessRecord, GuessView, NewGuess, NewPlayer, NewRoom, NewStroke, NewUser, PlayerRecord,
    RoomId, RoomRecord, RoomUpdate, RoomWithPlayers, StrokeRecord, UserId, UserRecord,
};

pub mod in_memory;
pub mod sea_orm;

pub use self::in_memory::InMemoryRoomStore;
pub use self::sea_orm::SeaOrmRoomStore;

/// Persistence boundary for rooms, players, guesses and strokes.
///
/// Both backends expose the same surface so the service layer never
/// knows whether it is talking to process memory or Postgres.
#[async_trait]
pub trait RoomStore: Send + Sync {
    // Users
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RoomError>;
    async fn load_user(&self, id: UserId) -> Result<Option<UserRecord>, RoomError>;
    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RoomError>;
    /// Adds one played game and `points` to the user's lifetime totals.
    async fn bump_user_stats(&self, id: UserId, points: i32) -> Result<(), RoomError>;

    // Rooms
    async fn insert_room(&self, room: NewRoom) -> Result<RoomRecord, RoomError>;
    async fn load_room(&self, id: RoomId) -> Result<Option<RoomRecord>, RoomError>;
    async fn load_room_by_code(&self, code: &str) -> Result<Option<RoomRecord>, RoomError>;
    async fn code_in_use(&self, code: &str) -> Result<bool, RoomError>;
    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, RoomError>;
    async fn update_room(&self, id: RoomId, update: RoomUpdate) -> Result<(), RoomError>;
    /// Removes the room and everything hanging off it.
    async fn delete_room(&self, id: RoomId) -> Result<(), RoomError>;

    // Players
    async fn insert_player(&self, player: NewPlayer) -> Result<PlayerRecord, RoomError>;
    async fn load_players(&self, room_id: RoomId) -> Result<Vec<PlayerRecord>, RoomError>;
    async fn delete_player(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError>;
    /// Clears `is_drawing` and `has_guessed` for every seat in the room.
    async fn reset_players(&self, room_id: RoomId) -> Result<(), RoomError>;
    async fn set_drawer(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError>;
    /// Credits a correct guess: bumps the seat score and marks the seat
    /// as having guessed.
    async fn award_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        points: i32,
    ) -> Result<(), RoomError>;

    // Guesses
    async fn insert_guess(&self, guess: NewGuess) -> Result<GuessRecord, RoomError>;
    async fn load_guesses(&self, room_id: RoomId) -> Result<Vec<GuessView>, RoomError>;

    // Strokes
    async fn insert_stroke(&self, stroke: NewStroke) -> Result<StrokeRecord, RoomError>;
    async fn delete_strokes(&self, room_id: RoomId) -> Result<(), RoomError>;

    // Joined views
    async fn load_room_with_players(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomWithPlayers>, RoomError>;

    /// Change feed driven by this store's own writes. Backends whose
    /// changes are observed externally return `None`.
    fn local_changes(&self) -> Option<&ChangeFeed>;
}
