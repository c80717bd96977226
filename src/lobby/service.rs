use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::identity::{generate_username, USERNAME_RETRIES};
use crate::relay::stroke::StrokeEvent;
use crate::words;

use super::error::RoomError;
use super::scoring;
use super::storage::{InMemoryRoomStore, RoomStore, SeaOrmRoomStore};
use super::types::{
    GuessOutcome, GuessView, NewGuess, NewPlayer, NewRoom, NewStroke, NewUser, RoomId,
    RoomRecord, RoomUpdate, RoomWithPlayers, UserId, UserRecord, DEFAULT_MAX_PLAYERS,
    ROUND_SECONDS,
};
use super::validation::{ensure_can_join, generate_room_code, is_quick_join_candidate};

const LOG_TARGET: &str = "lobby::service";

/// Re-rolls before giving up on finding an unused join code.
const CODE_RETRIES: usize = 5;

/// Room lifecycle operations exposed to the HTTP layer.
#[async_trait]
pub trait RoomService: Send + Sync {
    /// Creates a user with a generated anonymous handle.
    async fn create_anonymous_user(&self) -> Result<UserRecord, RoomError>;

    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, RoomError>;

    /// Creates a room named after the host and seats the host in it.
    async fn create_room(
        &self,
        host_id: UserId,
        is_public: bool,
    ) -> Result<RoomRecord, RoomError>;

    async fn join_room_by_code(&self, code: &str, user_id: UserId)
        -> Result<RoomRecord, RoomError>;

    /// Seats the caller in the fullest public room still waiting for
    /// players.
    async fn join_random_room(&self, user_id: UserId) -> Result<RoomRecord, RoomError>;

    async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError>;

    async fn start_game(&self, room_id: RoomId) -> Result<RoomRecord, RoomError>;

    async fn submit_guess(
        &self,
        room_id: RoomId,
        user_id: UserId,
        text: &str,
    ) -> Result<GuessOutcome, RoomError>;

    /// Persists a stroke. Storage failures are logged and swallowed so
    /// a flaky backend never interrupts a drawing in progress.
    async fn save_stroke(
        &self,
        room_id: RoomId,
        user_id: UserId,
        stroke: StrokeEvent,
    ) -> Result<(), RoomError>;

    /// Drops every stored stroke for the room. Failures are logged and
    /// swallowed like [`RoomService::save_stroke`].
    async fn clear_canvas(&self, room_id: RoomId) -> Result<(), RoomError>;

    async fn room_with_players(&self, room_id: RoomId) -> Result<RoomWithPlayers, RoomError>;

    async fn guesses(&self, room_id: RoomId) -> Result<Vec<GuessView>, RoomError>;
}

#[derive(Clone)]
pub struct RoomServiceFactory {
    store: Arc<dyn RoomStore>,
}

impl RoomServiceFactory {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self { store }
    }

    pub fn from_sea_orm(connection: DatabaseConnection) -> Self {
        Self::new(Arc::new(SeaOrmRoomStore::new(connection)) as Arc<dyn RoomStore>)
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRoomStore::default()) as Arc<dyn RoomStore>)
    }

    pub fn store(&self) -> Arc<dyn RoomStore> {
        Arc::clone(&self.store)
    }

    async fn require_user(&self, user_id: UserId) -> Result<UserRecord, RoomError> {
        self.store
            .load_user(user_id)
            .await?
            .ok_or(RoomError::UserNotFound)
    }

    async fn require_room(&self, room_id: RoomId) -> Result<RoomRecord, RoomError> {
        self.store
            .load_room(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    async fn fresh_room_code(&self) -> Result<String, RoomError> {
        // Collisions are rare with a 36^6 space; re-roll a few times and
        // accept the last candidate rather than loop forever.
        let mut code = generate_room_code();
        for _ in 0..CODE_RETRIES {
            if !self.store.code_in_use(&code).await? {
                break;
            }
            code = generate_room_code();
        }
        Ok(code)
    }
}

#[async_trait]
impl RoomService for RoomServiceFactory {
    async fn create_anonymous_user(&self) -> Result<UserRecord, RoomError> {
        let mut username = generate_username();
        for _ in 0..USERNAME_RETRIES {
            if self
                .store
                .load_user_by_username(&username)
                .await?
                .is_none()
            {
                break;
            }
            username = generate_username();
        }
        self.store
            .insert_user(NewUser {
                username,
                email: None,
            })
            .await
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, RoomError> {
        self.require_user(user_id).await
    }

    async fn create_room(
        &self,
        host_id: UserId,
        is_public: bool,
    ) -> Result<RoomRecord, RoomError> {
        let host = self.require_user(host_id).await?;
        let code = self.fresh_room_code().await?;
        let room = self
            .store
            .insert_room(NewRoom {
                code,
                name: format!("{}'s Room", host.username),
                host_id,
                max_players: DEFAULT_MAX_PLAYERS,
                is_public,
                current_word: Some(words::random_word().to_string()),
            })
            .await?;
        self.store
            .insert_player(NewPlayer {
                room_id: room.id,
                user_id: host_id,
            })
            .await?;
        Ok(room)
    }

    async fn join_room_by_code(
        &self,
        code: &str,
        user_id: UserId,
    ) -> Result<RoomRecord, RoomError> {
        self.require_user(user_id).await?;
        let code = code.trim().to_uppercase();
        let room = self
            .store
            .load_room_by_code(&code)
            .await?
            .ok_or(RoomError::RoomNotFound)?;
        let players = self.store.load_players(room.id).await?;
        ensure_can_join(&room, &players, user_id)?;
        self.store
            .insert_player(NewPlayer {
                room_id: room.id,
                user_id,
            })
            .await?;
        Ok(room)
    }

    async fn join_random_room(&self, user_id: UserId) -> Result<RoomRecord, RoomError> {
        self.require_user(user_id).await?;
        let mut candidates = Vec::new();
        for room in self.store.list_rooms().await? {
            if !room.is_public || room.is_active {
                continue;
            }
            let players = self.store.load_players(room.id).await?;
            if is_quick_join_candidate(&room, &players, user_id) {
                candidates.push((room, players.len()));
            }
        }
        // Prefer the room closest to starting.
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        let (room, _) = candidates.into_iter().next().ok_or(RoomError::NoAvailableRooms)?;
        self.store
            .insert_player(NewPlayer {
                room_id: room.id,
                user_id,
            })
            .await?;
        Ok(room)
    }

    async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError> {
        let room = self.require_room(room_id).await?;
        self.store.delete_player(room_id, user_id).await?;
        let remaining = self.store.load_players(room_id).await?;
        if remaining.is_empty() {
            self.store.delete_room(room_id).await?;
            return Ok(());
        }
        if room.host_id == user_id {
            self.store
                .update_room(
                    room_id,
                    RoomUpdate {
                        host_id: Some(remaining[0].user_id),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn start_game(&self, room_id: RoomId) -> Result<RoomRecord, RoomError> {
        self.require_room(room_id).await?;
        let players = self.store.load_players(room_id).await?;
        if players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        let drawer = {
            let mut rng = rand::thread_rng();
            players
                .choose(&mut rng)
                .ok_or(RoomError::NotEnoughPlayers)?
                .user_id
        };
        self.store.reset_players(room_id).await?;
        self.store.set_drawer(room_id, drawer).await?;
        self.store
            .update_room(
                room_id,
                RoomUpdate {
                    is_active: Some(true),
                    current_drawer_id: Some(Some(drawer)),
                    time_left: Some(ROUND_SECONDS),
                    round_number: Some(1),
                    ..Default::default()
                },
            )
            .await?;
        self.require_room(room_id).await
    }

    async fn submit_guess(
        &self,
        room_id: RoomId,
        user_id: UserId,
        text: &str,
    ) -> Result<GuessOutcome, RoomError> {
        let room = self.require_room(room_id).await?;
        self.require_user(user_id).await?;

        let is_correct = scoring::is_correct(text, room.current_word.as_deref());
        let points = if is_correct {
            scoring::reward(room.time_left)
        } else {
            0
        };

        self.store
            .insert_guess(NewGuess {
                room_id,
                user_id,
                guess: text.trim().to_string(),
                is_correct,
            })
            .await?;

        if is_correct {
            self.store.award_player(room_id, user_id, points).await?;
            self.store.bump_user_stats(user_id, points).await?;
        }

        Ok(GuessOutcome { is_correct, points })
    }

    async fn save_stroke(
        &self,
        room_id: RoomId,
        user_id: UserId,
        stroke: StrokeEvent,
    ) -> Result<(), RoomError> {
        let result = self
            .store
            .insert_stroke(NewStroke {
                room_id,
                user_id,
                stroke_data: stroke,
            })
            .await;
        if let Err(err) = result {
            warn!(target: LOG_TARGET, %room_id, error = %err, "failed to save drawing stroke");
        }
        Ok(())
    }

    async fn clear_canvas(&self, room_id: RoomId) -> Result<(), RoomError> {
        if let Err(err) = self.store.delete_strokes(room_id).await {
            warn!(target: LOG_TARGET, %room_id, error = %err, "failed to clear canvas");
        }
        Ok(())
    }

    async fn room_with_players(&self, room_id: RoomId) -> Result<RoomWithPlayers, RoomError> {
        self.store
            .load_room_with_players(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    async fn guesses(&self, room_id: RoomId) -> Result<Vec<GuessView>, RoomError> {
        self.require_room(room_id).await?;
        self.store.load_guesses(room_id).await
    }
}
