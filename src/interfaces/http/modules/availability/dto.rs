//! Availability DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::AvailableRoom;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomAvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Ignore this booking item's own stay, for "can I move it here" checks
    pub exclude_item: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomAvailabilityDto {
    pub room_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "two")]
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
}

fn two() -> i32 {
    2
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableRoomDto {
    pub room_id: i32,
    pub room_number: String,
    pub room_type_id: i32,
    pub room_type_name: String,
    pub nights: i64,
    /// Base price plus occupancy surcharges, per night
    pub nightly_price: i64,
    pub total: i64,
}

impl From<AvailableRoom> for AvailableRoomDto {
    fn from(r: AvailableRoom) -> Self {
        Self {
            room_id: r.room_id,
            room_number: r.room_number,
            room_type_id: r.room_type_id,
            room_type_name: r.room_type_name,
            nights: r.price.nights,
            nightly_price: r.price.rate.nightly_price,
            total: r.price.item_total,
        }
    }
}
