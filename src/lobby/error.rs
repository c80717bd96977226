use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by room lifecycle operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("game already started")]
    GameInProgress,

    #[error("room is full")]
    RoomFull,

    #[error("you are already in this room")]
    AlreadyJoined,

    #[error("need at least 2 players to start")]
    NotEnoughPlayers,

    #[error("no available rooms found")]
    NoAvailableRooms,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
}

impl RoomError {
    pub fn validation(message: impl Into<String>) -> Self {
        RoomError::Validation(message.into())
    }
}
