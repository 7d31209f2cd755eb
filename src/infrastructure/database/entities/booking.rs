//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub customer_id: Option<i32>,
    pub guest_name: String,

    /// pending, reserved, checked_in, checked_out, cancelled, no_show
    pub stay_status: String,
    /// pending, paid, refunded, partial
    pub payment_status: String,
    #[sea_orm(nullable)]
    pub payment_method: Option<String>,
    /// online, offline
    pub booking_method: String,

    pub subtotal: i64,
    #[sea_orm(nullable)]
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total_price: i64,
    pub paid_amount: i64,
    pub refundable_amount: i64,

    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,
    #[sea_orm(nullable)]
    pub canceled_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub canceled_by: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::booking_service::Entity")]
    Services,
    #[sea_orm(has_many = "super::incident_charge::Entity")]
    Incidents,
    #[sea_orm(has_many = "super::refund_request::Entity")]
    RefundRequests,
}

impl Related<super::booking_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::booking_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Services.def()
    }
}

impl Related<super::incident_charge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incidents.def()
    }
}

impl Related<super::refund_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefundRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
