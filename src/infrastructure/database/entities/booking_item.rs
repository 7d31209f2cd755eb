//! Booking item entity (one room for one date range)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub booking_id: i32,
    pub room_id: i32,

    pub check_in: Date,
    pub check_out: Date,
    pub adults: i32,
    pub children: i32,

    pub nightly_price: i64,
    pub extra_adult_fee: i64,
    pub extra_child_fee: i64,
    pub nights: i32,
    pub item_total: i64,

    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
