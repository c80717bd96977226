use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub host_id: Uuid,
    pub max_players: i32,
    pub is_active: bool,
    pub is_public: bool,
    pub current_word: Option<String>,
    pub current_drawer_id: Option<Uuid>,
    pub time_left: i32,
    pub round_number: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::room_players::Entity")]
    RoomPlayers,
    #[sea_orm(has_many = "super::guesses::Entity")]
    Guesses,
    #[sea_orm(has_many = "super::drawing_strokes::Entity")]
    DrawingStrokes,
}

impl Related<super::room_players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoomPlayers.def()
    }
}

impl Related<super::guesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guesses.def()
    }
}

impl Related<super::drawing_strokes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DrawingStrokes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
