//! Postgres-backed store.
//!
//! Writes happen through SeaORM; change notifications are not produced
//! here because the realtime websocket observes them straight from the
//! replication stream.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{drawing_strokes, guesses, room_players, rooms, users};
use crate::relay::feed::ChangeFeed;
use crate::relay::stroke::StrokeEvent;

use super::super::error::RoomError;
use super::super::types::{
    GuessRecord, GuessView, NewGuess, NewPlayer, NewRoom, NewStroke, NewUser, PlayerRecord,
    PlayerView, RoomId, RoomRecord, RoomUpdate, RoomWithPlayers, StrokeRecord, UserId,
    UserRecord, DEFAULT_MAX_PLAYERS, ROUND_SECONDS,
};
use super::RoomStore;

pub struct SeaOrmRoomStore {
    conn: DatabaseConnection,
}

impl SeaOrmRoomStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

impl From<users::Model> for UserRecord {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            games_played: model.games_played,
            total_score: model.total_score,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<rooms::Model> for RoomRecord {
    fn from(model: rooms::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            host_id: model.host_id,
            max_players: model.max_players,
            is_active: model.is_active,
            is_public: model.is_public,
            current_word: model.current_word,
            current_drawer_id: model.current_drawer_id,
            time_left: model.time_left,
            round_number: model.round_number,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<room_players::Model> for PlayerRecord {
    fn from(model: room_players::Model) -> Self {
        Self {
            id: model.id,
            room_id: model.room_id,
            user_id: model.user_id,
            score: model.score,
            is_drawing: model.is_drawing,
            has_guessed: model.has_guessed,
            joined_at: model.joined_at,
        }
    }
}

impl From<guesses::Model> for GuessRecord {
    fn from(model: guesses::Model) -> Self {
        Self {
            id: model.id,
            room_id: model.room_id,
            user_id: model.user_id,
            guess: model.guess,
            is_correct: model.is_correct,
            created_at: model.created_at,
        }
    }
}

fn stroke_from_model(model: drawing_strokes::Model) -> Result<StrokeRecord, RoomError> {
    let stroke_data: StrokeEvent = serde_json::from_value(model.stroke_data)
        .map_err(|err| RoomError::validation(format!("malformed stroke payload: {err}")))?;
    Ok(StrokeRecord {
        id: model.id,
        room_id: model.room_id,
        user_id: model.user_id,
        stroke_data,
        created_at: model.created_at,
    })
}

#[async_trait]
impl RoomStore for SeaOrmRoomStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RoomError> {
        let now = Utc::now();
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(user.username),
            email: Set(user.email),
            games_played: Set(0),
            total_score: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model.insert(&self.conn).await?;
        Ok(saved.into())
    }

    async fn load_user(&self, id: UserId) -> Result<Option<UserRecord>, RoomError> {
        let found = users::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(found.map(Into::into))
    }

    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RoomError> {
        let found = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn bump_user_stats(&self, id: UserId, points: i32) -> Result<(), RoomError> {
        users::Entity::update_many()
            .col_expr(
                users::Column::GamesPlayed,
                Expr::col(users::Column::GamesPlayed).add(1),
            )
            .col_expr(
                users::Column::TotalScore,
                Expr::col(users::Column::TotalScore).add(points),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn insert_room(&self, room: NewRoom) -> Result<RoomRecord, RoomError> {
        let now = Utc::now();
        let model = rooms::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(room.code),
            name: Set(room.name),
            host_id: Set(room.host_id),
            max_players: Set(if room.max_players > 0 {
                room.max_players
            } else {
                DEFAULT_MAX_PLAYERS
            }),
            is_active: Set(false),
            is_public: Set(room.is_public),
            current_word: Set(room.current_word),
            current_drawer_id: Set(None),
            time_left: Set(ROUND_SECONDS),
            round_number: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model.insert(&self.conn).await?;
        Ok(saved.into())
    }

    async fn load_room(&self, id: RoomId) -> Result<Option<RoomRecord>, RoomError> {
        let found = rooms::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(found.map(Into::into))
    }

    async fn load_room_by_code(&self, code: &str) -> Result<Option<RoomRecord>, RoomError> {
        let found = rooms::Entity::find()
            .filter(rooms::Column::Code.eq(code))
            .one(&self.conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn code_in_use(&self, code: &str) -> Result<bool, RoomError> {
        let found = rooms::Entity::find()
            .filter(rooms::Column::Code.eq(code))
            .one(&self.conn)
            .await?;
        Ok(found.is_some())
    }

    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, RoomError> {
        let found = rooms::Entity::find()
            .order_by_asc(rooms::Column::CreatedAt)
            .all(&self.conn)
            .await?;
        Ok(found.into_iter().map(Into::into).collect())
    }

    async fn update_room(&self, id: RoomId, update: RoomUpdate) -> Result<(), RoomError> {
        let mut model = rooms::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(host_id) = update.host_id {
            model.host_id = Set(host_id);
        }
        if let Some(is_active) = update.is_active {
            model.is_active = Set(is_active);
        }
        if let Some(word) = update.current_word {
            model.current_word = Set(word);
        }
        if let Some(drawer) = update.current_drawer_id {
            model.current_drawer_id = Set(drawer);
        }
        if let Some(time_left) = update.time_left {
            model.time_left = Set(time_left);
        }
        if let Some(round_number) = update.round_number {
            model.round_number = Set(round_number);
        }
        model.updated_at = Set(Utc::now());
        model.update(&self.conn).await?;
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), RoomError> {
        drawing_strokes::Entity::delete_many()
            .filter(drawing_strokes::Column::RoomId.eq(id))
            .exec(&self.conn)
            .await?;
        guesses::Entity::delete_many()
            .filter(guesses::Column::RoomId.eq(id))
            .exec(&self.conn)
            .await?;
        room_players::Entity::delete_many()
            .filter(room_players::Column::RoomId.eq(id))
            .exec(&self.conn)
            .await?;
        rooms::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    async fn insert_player(&self, player: NewPlayer) -> Result<PlayerRecord, RoomError> {
        let model = room_players::ActiveModel {
            id: Set(Uuid::new_v4()),
            room_id: Set(player.room_id),
            user_id: Set(player.user_id),
            score: Set(0),
            is_drawing: Set(false),
            has_guessed: Set(false),
            joined_at: Set(Utc::now()),
        };
        let saved = model.insert(&self.conn).await?;
        Ok(saved.into())
    }

    async fn load_players(&self, room_id: RoomId) -> Result<Vec<PlayerRecord>, RoomError> {
        let found = room_players::Entity::find()
            .filter(room_players::Column::RoomId.eq(room_id))
            .order_by_asc(room_players::Column::JoinedAt)
            .all(&self.conn)
            .await?;
        Ok(found.into_iter().map(Into::into).collect())
    }

    async fn delete_player(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError> {
        room_players::Entity::delete_many()
            .filter(room_players::Column::RoomId.eq(room_id))
            .filter(room_players::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn reset_players(&self, room_id: RoomId) -> Result<(), RoomError> {
        room_players::Entity::update_many()
            .col_expr(room_players::Column::IsDrawing, Expr::value(false))
            .col_expr(room_players::Column::HasGuessed, Expr::value(false))
            .filter(room_players::Column::RoomId.eq(room_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn set_drawer(&self, room_id: RoomId, user_id: UserId) -> Result<(), RoomError> {
        room_players::Entity::update_many()
            .col_expr(room_players::Column::IsDrawing, Expr::value(true))
            .filter(room_players::Column::RoomId.eq(room_id))
            .filter(room_players::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn award_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        points: i32,
    ) -> Result<(), RoomError> {
        room_players::Entity::update_many()
            .col_expr(
                room_players::Column::Score,
                Expr::col(room_players::Column::Score).add(points),
            )
            .col_expr(room_players::Column::HasGuessed, Expr::value(true))
            .filter(room_players::Column::RoomId.eq(room_id))
            .filter(room_players::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn insert_guess(&self, guess: NewGuess) -> Result<GuessRecord, RoomError> {
        let model = guesses::ActiveModel {
            id: Set(Uuid::new_v4()),
            room_id: Set(guess.room_id),
            user_id: Set(guess.user_id),
            guess: Set(guess.guess),
            is_correct: Set(guess.is_correct),
            created_at: Set(Utc::now()),
        };
        let saved = model.insert(&self.conn).await?;
        Ok(saved.into())
    }

    async fn load_guesses(&self, room_id: RoomId) -> Result<Vec<GuessView>, RoomError> {
        let found = guesses::Entity::find()
            .filter(guesses::Column::RoomId.eq(room_id))
            .order_by_asc(guesses::Column::CreatedAt)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await?;
        Ok(found
            .into_iter()
            .map(|(guess, user)| GuessView {
                guess: guess.into(),
                user: user.map(Into::into),
            })
            .collect())
    }

    async fn insert_stroke(&self, stroke: NewStroke) -> Result<StrokeRecord, RoomError> {
        let payload = serde_json::to_value(&stroke.stroke_data)
            .map_err(|err| RoomError::validation(format!("unserializable stroke: {err}")))?;
        let model = drawing_strokes::ActiveModel {
            id: Set(Uuid::new_v4()),
            room_id: Set(stroke.room_id),
            user_id: Set(stroke.user_id),
            stroke_data: Set(payload),
            created_at: Set(Utc::now()),
        };
        let saved = model.insert(&self.conn).await?;
        stroke_from_model(saved)
    }

    async fn delete_strokes(&self, room_id: RoomId) -> Result<(), RoomError> {
        drawing_strokes::Entity::delete_many()
            .filter(drawing_strokes::Column::RoomId.eq(room_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn load_room_with_players(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomWithPlayers>, RoomError> {
        let room = match rooms::Entity::find_by_id(room_id).one(&self.conn).await? {
            Some(room) => room,
            None => return Ok(None),
        };
        let players = room_players::Entity::find()
            .filter(room_players::Column::RoomId.eq(room_id))
            .order_by_asc(room_players::Column::JoinedAt)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await?;
        Ok(Some(RoomWithPlayers {
            room: room.into(),
            players: players
                .into_iter()
                .map(|(player, user)| PlayerView {
                    player: player.into(),
                    user: user.map(Into::into),
                })
                .collect(),
        }))
    }

    fn local_changes(&self) -> Option<&ChangeFeed> {
        None
    }
}
