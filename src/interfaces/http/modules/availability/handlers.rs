//! Availability handlers

use axum::extract::{Path, Query, State};
use axum::Json;

use super::dto::{AvailableRoomDto, RoomAvailabilityDto, RoomAvailabilityQuery, SearchQuery};
use crate::domain::{DateRange, DomainError};
use crate::interfaces::http::common::{ApiResponse, ApiResult};
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/availability",
    tag = "Availability",
    params(("room_id" = i32, Path, description = "Room id"), RoomAvailabilityQuery),
    responses(
        (status = 200, description = "Whether the room is free for the nights", body = ApiResponse<RoomAvailabilityDto>),
        (status = 404, description = "Room not found"),
        (status = 422, description = "check_out is not after check_in")
    )
)]
pub async fn check_room(
    State(state): State<AppState>,
    Path(room_id): Path<i32>,
    Query(query): Query<RoomAvailabilityQuery>,
) -> ApiResult<RoomAvailabilityDto> {
    let range = DateRange::new(query.check_in, query.check_out)?;
    let available = state
        .availability
        .is_room_free(room_id, range, query.exclude_item)
        .await?;
    Ok(Json(ApiResponse::success(RoomAvailabilityDto {
        room_id,
        check_in: range.check_in,
        check_out: range.check_out,
        available,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/availability",
    tag = "Availability",
    params(SearchQuery),
    responses(
        (status = 200, description = "Free rooms that fit the party, cheapest first", body = ApiResponse<Vec<AvailableRoomDto>>),
        (status = 422, description = "Invalid dates or party size")
    )
)]
pub async fn search_rooms(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<AvailableRoomDto>> {
    if query.adults < 1 || query.children < 0 {
        return Err(DomainError::Validation(
            "a party needs at least one adult and no negative children".into(),
        )
        .into());
    }
    let range = DateRange::new(query.check_in, query.check_out)?;
    let rooms = state
        .availability
        .search(range, query.adults, query.children)
        .await?;
    Ok(Json(ApiResponse::success(
        rooms.into_iter().map(AvailableRoomDto::from).collect(),
    )))
}
