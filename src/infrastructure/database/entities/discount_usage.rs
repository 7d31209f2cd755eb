//! Discount usage ledger entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount_usages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub code: String,
    #[sea_orm(nullable)]
    pub customer_id: Option<i32>,
    pub booking_id: i32,
    pub used_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
