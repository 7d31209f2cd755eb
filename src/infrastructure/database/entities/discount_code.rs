//! Discount code entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored upper-case
    #[sea_orm(unique)]
    pub code: String,

    /// percent, fixed
    pub discount_type: String,
    pub value: i64,
    pub min_total: i64,

    #[sea_orm(nullable)]
    pub max_uses: Option<i32>,
    #[sea_orm(nullable)]
    pub max_uses_per_user: Option<i32>,
    #[sea_orm(nullable)]
    pub max_discount_amount: Option<i64>,

    pub start_date: Date,
    pub end_date: Date,

    /// active, inactive
    pub status: String,
    pub used_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
