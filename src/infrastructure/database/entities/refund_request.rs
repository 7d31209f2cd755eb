//! Refund request entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refund_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub booking_id: i32,
    #[sea_orm(nullable)]
    pub booking_item_id: Option<i32>,
    pub amount: i64,

    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,

    /// pending, approved, rejected, completed
    pub status: String,
    #[sea_orm(nullable)]
    pub receipt_ref: Option<String>,
    #[sea_orm(nullable)]
    pub admin_notes: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
