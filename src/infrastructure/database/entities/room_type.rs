//! Room type entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Per night, smallest currency unit
    pub base_price: i64,
    pub base_adults: i32,
    pub base_children: i32,
    pub max_adults: i32,
    pub max_children: i32,
    pub extra_adult_fee: i64,
    pub extra_child_fee: i64,

    pub refundable: bool,
    pub refund_percent: i32,
    pub refund_deadline_hours: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::room::Entity")]
    Rooms,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
