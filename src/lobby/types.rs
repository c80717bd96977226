use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::relay::stroke::StrokeEvent;

pub type UserId = Uuid;
pub type RoomId = Uuid;
pub type PlayerId = Uuid;
pub type GuessId = Uuid;
pub type StrokeId = Uuid;

/// Seats available in a room unless the host asks for fewer.
pub const DEFAULT_MAX_PLAYERS: i32 = 8;

/// Seconds on the clock when a round starts.
pub const ROUND_SECONDS: i32 = 600;

/// Length of a join code.
pub const ROOM_CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub games_played: i32,
    pub total_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub code: String,
    pub name: String,
    pub host_id: UserId,
    pub max_players: i32,
    pub is_active: bool,
    pub is_public: bool,
    pub current_word: Option<String>,
    pub current_drawer_id: Option<UserId>,
    pub time_left: i32,
    pub round_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub code: String,
    pub name: String,
    pub host_id: UserId,
    pub max_players: i32,
    pub is_public: bool,
    pub current_word: Option<String>,
}

/// Partial update applied to a room row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RoomUpdate {
    pub host_id: Option<UserId>,
    pub is_active: Option<bool>,
    pub current_word: Option<Option<String>>,
    pub current_drawer_id: Option<Option<UserId>>,
    pub time_left: Option<i32>,
    pub round_number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub score: i32,
    pub is_drawing: bool,
    pub has_guessed: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub room_id: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub id: GuessId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub guess: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGuess {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub guess: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub id: StrokeId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub stroke_data: StrokeEvent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStroke {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub stroke_data: StrokeEvent,
}

/// A seated player joined with their user row when it still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    #[serde(flatten)]
    pub player: PlayerRecord,
    pub user: Option<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomWithPlayers {
    #[serde(flatten)]
    pub room: RoomRecord,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessView {
    #[serde(flatten)]
    pub guess: GuessRecord,
    pub user: Option<UserRecord>,
}

/// Result of evaluating a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessOutcome {
    pub is_correct: bool,
    pub points: i32,
}

impl RoomWithPlayers {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
