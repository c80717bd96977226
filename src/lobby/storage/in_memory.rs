//! Process-local store used when no database is configured.
//!
//! Besides serving reads and writes it mirrors every mutation onto a
//! [`ChangeFeed`], so room watchers behave identically whether changes
//! come from here or from the Postgres replication stream.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::relay::feed::{ChangeFeed, ChangeOp, ChangeTable, TableChange};

use super::super::error::RoomError;
use super::super::types::{
    GuessRecord, GuessView, NewGuess, NewPlayer, NewRoom, NewStroke, NewUser, PlayerRecord,
    PlayerView, RoomId, RoomRecord, RoomUpdate, RoomWithPlayers, StrokeRecord, UserId,
    UserRecord, DEFAULT_MAX_PLAYERS, ROUND_SECONDS,
};
use super::RoomStore;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserRecord>,
    rooms: HashMap<RoomId, RoomRecord>,
    players: Vec<PlayerRecord>,
    guesses: Vec<GuessRecord>,
    strokes: Vec<StrokeRecord>,
}

pub struct InMemoryRoomStore {
    inner: RwLock<Inner>,
    feed: ChangeFeed,
}

impl InMemoryRoomStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            feed,
        }
    }

    fn publish<T: Serialize>(&self, table: ChangeTable, op: ChangeOp, room_id: Option<RoomId>, row: &T) {
        let row = serde_json::to_value(row).unwrap_or(serde_json::Value::Null);
        self.feed.publish(TableChange {
            table,
            op,
            room_id,
            row,
        });
    }
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new(ChangeFeed::default())
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RoomError> {
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            games_played: 0,
            total_score: 0,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().users.insert(record.id, record.clone());
        self.publish(ChangeTable::Users, ChangeOp::Insert, None, &record);
        Ok(record)
    }

    async fn load_user(&self, id: UserId) -> Result<Option<UserRecord>, RoomError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RoomError> {
        Ok(self
            .inner
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn bump_user_stats(&self, id: UserId, points: i32) -> Result<(), RoomError> {
        let updated = {
            let mut inner = self.inner.write();
            match inner.users.get_mut(&id) {
                Some(user) => {
                    user.games_played += 1;
                    user.total_score += points;
                    user.updated_at = Utc::now();
                    Some(user.clone())
                }
                None => None,
            }
        };
        if let Some(user) = updated {
            self.publish(ChangeTable::Users, ChangeOp::Update, None, &user);
        }
        Ok(())
    }

    async fn insert_room(&self, room: NewRoom) -> Result<RoomRecord, RoomError> {
        let now = Utc::now();
        let record = RoomRecord {
            id: Uuid::new_v4(),
            code: room.code,
            name: room.name,
            host_id: room.host_id,
            max_players: if room.max_players > 0 {
                room.max_players
            } else {
                DEFAULT_MAX_PLAYERS
            },
            is_active: false,
            is_public: room.is_public,
            current_word: room.current_word,
            current_drawer_id: None,
            time_left: ROUND_SECONDS,
            round_number: 1,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().rooms.insert(record.id, record.clone());
        self.publish(ChangeTable::Rooms, ChangeOp::Insert, Some(record.id), &record);
        Ok(record)
    }

    async fn load_room(&self, id: RoomId) -> Result<Option<RoomRecord>, RoomError> {
        Ok(self.inner.read().rooms.get(&id).cloned())
    }

    async fn load_room_by_code(&self, code: &str) -> Result<Option<RoomRecord>, RoomError> {
        Ok(self
            .inner
            .read()
            .rooms
            .values()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn code_in_use(&self, code: &str) -> Result<bool, RoomError> {
        Ok(self.inner.read().rooms.values().any(|r| r.code == code))
    }

    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, RoomError> {
        Ok(self.inner.read().rooms.values().cloned().collect())
    }

    async fn update_room(&self, id: RoomId, update: RoomUpdate) -> Result<(), RoomError> {
        let updated = {
            let mut inner = self.inner.write();
            let room = inner.rooms.get_mut(&id).ok_or(RoomError::RoomNotFound)?;
            if let Some(host_id) = update.host_id {
                room.host_id = host_id;
            }
            if let Some(is_active) = update.is_active {
                room.is_active = is_active;
            }
            if let Some(word) = update.current_word {
                room.current_word = word;
            }
            if let Some(drawer) = update.current_drawer_id {
                room.current_drawer_id = drawer;
            }
            if let Some(time_left) = update.time_left {
                room.time_left = time_left;
            }
            if let Some(round_number) = update.round_number {
                room.round_number = round_number;
            }
            room.updated_at = Utc::now();
            room.clone()
        };
        self.publish(ChangeTable::Rooms, ChangeOp::Update, Some(id), &updated);
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), RoomError> {
        let removed = {
            let mut inner = self.inner.write();
            inner.players.retain(|p| p.room_id != id);
            inner.guesses.retain(|g| g.room_id != id);
            inner.strokes.retain(|s| s.room_id != id);
            inner.rooms.remove(&id)
        };
        if let Some(room) = removed {
            self.publish(ChangeTable::Rooms, ChangeOp::Delete, Some(id), &room);
        }
        Ok(())
    }

    async fn insert_player(&self, player: NewPlayer) -> Result<PlayerRecord, RoomError> {
        let record = PlayerRecord {
            id: Uuid::new_v4(),
            room_id: player.room_id,
            user_id: player.user_id,
            score: 0,
            is_drawing: false,
            has_guessed: false,
            joined_at: Utc::now(),
        };
        self.inner.write().players.push(record.clone());
        self.publish(
            ChangeTable::RoomPlayers,
            ChangeOp::Insert,
            Some(record.room_id),
            &record,
        );
        Ok(record)
    }

    async fn load_players(&self, room_id: RoomId) -> Result<Vec<PlayerRecord>, RoomError> {
        Ok(self
            .inner
            .read()
            .players
            .iter()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn delete_player(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError> {
        let removed = {
            let mut inner = self.inner.write();
            let before = inner.players.len();
            inner
                .players
                .retain(|p| !(p.room_id == room_id && p.user_id == user_id));
            before != inner.players.len()
        };
        if removed {
            self.publish(
                ChangeTable::RoomPlayers,
                ChangeOp::Delete,
                Some(room_id),
                &serde_json::json!({ "room_id": room_id, "user_id": user_id }),
            );
        }
        Ok(())
    }

    async fn reset_players(&self, room_id: RoomId) -> Result<(), RoomError> {
        let updated: Vec<PlayerRecord> = {
            let mut inner = self.inner.write();
            inner
                .players
                .iter_mut()
                .filter(|p| p.room_id == room_id)
                .map(|p| {
                    p.is_drawing = false;
                    p.has_guessed = false;
                    p.clone()
                })
                .collect()
        };
        for player in updated {
            self.publish(ChangeTable::RoomPlayers, ChangeOp::Update, Some(room_id), &player);
        }
        Ok(())
    }

    async fn set_drawer(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError> {
        let updated = {
            let mut inner = self.inner.write();
            inner
                .players
                .iter_mut()
                .find(|p| p.room_id == room_id && p.user_id == user_id)
                .map(|p| {
                    p.is_drawing = true;
                    p.clone()
                })
        };
        if let Some(player) = updated {
            self.publish(ChangeTable::RoomPlayers, ChangeOp::Update, Some(room_id), &player);
        }
        Ok(())
    }

    async fn award_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        points: i32,
    ) -> Result<(), RoomError> {
        let updated = {
            let mut inner = self.inner.write();
            inner
                .players
                .iter_mut()
                .find(|p| p.room_id == room_id && p.user_id == user_id)
                .map(|p| {
                    p.score += points;
                    p.has_guessed = true;
                    p.clone()
                })
        };
        // Zero matched seats is a silent success, like an UPDATE that
        // matches no rows.
        if let Some(player) = updated {
            self.publish(ChangeTable::RoomPlayers, ChangeOp::Update, Some(room_id), &player);
        }
        Ok(())
    }

    async fn insert_guess(&self, guess: NewGuess) -> Result<GuessRecord, RoomError> {
        let record = GuessRecord {
            id: Uuid::new_v4(),
            room_id: guess.room_id,
            user_id: guess.user_id,
            guess: guess.guess,
            is_correct: guess.is_correct,
            created_at: Utc::now(),
        };
        self.inner.write().guesses.push(record.clone());
        self.publish(
            ChangeTable::Guesses,
            ChangeOp::Insert,
            Some(record.room_id),
            &record,
        );
        Ok(record)
    }

    async fn load_guesses(&self, room_id: RoomId) -> Result<Vec<GuessView>, RoomError> {
        let inner = self.inner.read();
        Ok(inner
            .guesses
            .iter()
            .filter(|g| g.room_id == room_id)
            .map(|g| GuessView {
                guess: g.clone(),
                user: inner.users.get(&g.user_id).cloned(),
            })
            .collect())
    }

    async fn insert_stroke(&self, stroke: NewStroke) -> Result<StrokeRecord, RoomError> {
        let record = StrokeRecord {
            id: Uuid::new_v4(),
            room_id: stroke.room_id,
            user_id: stroke.user_id,
            stroke_data: stroke.stroke_data,
            created_at: Utc::now(),
        };
        self.inner.write().strokes.push(record.clone());
        self.publish(
            ChangeTable::DrawingStrokes,
            ChangeOp::Insert,
            Some(record.room_id),
            &record,
        );
        Ok(record)
    }

    async fn delete_strokes(&self, room_id: RoomId) -> Result<(), RoomError> {
        self.inner.write().strokes.retain(|s| s.room_id != room_id);
        self.publish(
            ChangeTable::DrawingStrokes,
            ChangeOp::Delete,
            Some(room_id),
            &serde_json::json!({ "room_id": room_id }),
        );
        Ok(())
    }

    async fn load_room_with_players(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomWithPlayers>, RoomError> {
        let inner = self.inner.read();
        let room = match inner.rooms.get(&room_id) {
            Some(room) => room.clone(),
            None => return Ok(None),
        };
        let players = inner
            .players
            .iter()
            .filter(|p| p.room_id == room_id)
            .map(|p| PlayerView {
                player: p.clone(),
                user: inner.users.get(&p.user_id).cloned(),
            })
            .collect();
        Ok(Some(RoomWithPlayers { room, players }))
    }

    fn local_changes(&self) -> Option<&ChangeFeed> {
        Some(&self.feed)
    }
}
