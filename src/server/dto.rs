use serde::{Deserialize, Serialize};

use crate::lobby::types::{
    GuessOutcome, GuessView, RoomRecord, RoomWithPlayers, UserId, UserRecord,
};
use crate::relay::stroke::StrokeEvent;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub host_id: UserId,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct JoinByCodeRequest {
    pub code: String,
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct QuickJoinRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRoomRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub user_id: UserId,
    pub guess: String,
}

#[derive(Debug, Deserialize)]
pub struct StrokeRequest {
    pub user_id: UserId,
    pub stroke: StrokeEvent,
}

#[derive(Serialize)]
pub struct RoomResponse {
    pub room: RoomRecord,
}

#[derive(Serialize)]
pub struct RoomViewResponse {
    pub room: RoomWithPlayers,
}

#[derive(Serialize)]
pub struct GuessResponse {
    #[serde(flatten)]
    pub outcome: GuessOutcome,
}

#[derive(Serialize)]
pub struct GuessListResponse {
    pub guesses: Vec<GuessView>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserRecord,
}

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

impl AcceptedResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
