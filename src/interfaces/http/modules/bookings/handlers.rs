//! Booking lifecycle handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    BookingDto, BookingPage, CancelRequest, CancelResponse, ChangeRoomRequest, CheckOutRequest,
    CreateBookingRequest, IncidentDto, IncidentRequest, ListBookingsQuery, StayStatusDto,
};
use crate::domain::booking::BookingFilter;
use crate::domain::{DateRange, DomainError, StayStatus};
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, RequestActor, ValidatedJson};
use crate::interfaces::http::router::AppState;
use crate::shared::PaginationParams;

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created as pending", body = ApiResponse<BookingDto>),
        (status = 404, description = "Room, room type or service not found"),
        (status = 409, description = "A room is already taken for the dates"),
        (status = 422, description = "Invalid request or discount rejected"),
        (status = 503, description = "Rooms are busy, retry")
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDto>>), ApiError> {
    let booking = state.bookings.create(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(BookingDto::new(&booking, &state.status_codes))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<BookingDto> {
    let booking = state.bookings.get(id).await?;
    Ok(Json(ApiResponse::success(BookingDto::new(&booking, &state.status_codes))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    params(ListBookingsQuery),
    responses(
        (status = 200, description = "Bookings, newest first", body = ApiResponse<BookingPage>),
        (status = 422, description = "Unknown status")
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> ApiResult<BookingPage> {
    let stay_status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_status(&state, raw)?),
    };
    let filter = BookingFilter {
        stay_status,
        date: query.date,
        customer_id: query.customer_id,
    };
    let page = state
        .bookings
        .list(&filter, PaginationParams::new(query.page, query.limit))
        .await?;

    Ok(Json(ApiResponse::success(BookingPage {
        items: page
            .items
            .iter()
            .map(|b| BookingDto::new(b, &state.status_codes))
            .collect(),
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    })))
}

/// Accepts a status name or its legacy numeric code.
fn parse_status(state: &AppState, raw: &str) -> Result<StayStatus, ApiError> {
    if let Ok(code) = raw.parse::<i32>() {
        return state
            .status_codes
            .status(code)
            .ok_or_else(|| DomainError::Validation(format!("unknown status code {code}")).into());
    }
    raw.parse::<StayStatus>()
        .map_err(|e| DomainError::Validation(e).into())
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/statuses",
    tag = "Bookings",
    responses(
        (status = 200, description = "Every stay status with display metadata", body = ApiResponse<Vec<StayStatusDto>>)
    )
)]
pub async fn list_stay_statuses(State(state): State<AppState>) -> ApiResult<Vec<StayStatusDto>> {
    let statuses = StayStatus::ALL
        .iter()
        .map(|s| StayStatusDto::new(*s, &state.status_codes))
        .collect();
    Ok(Json(ApiResponse::success(statuses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<CancelResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Booking can no longer be cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<CancelRequest>,
) -> ApiResult<CancelResponse> {
    let outcome = state.bookings.cancel(id, &request.reason, &actor).await?;
    Ok(Json(ApiResponse::success(CancelResponse {
        booking: BookingDto::new(&outcome.booking, &state.status_codes),
        refund_due: outcome.refund_due,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/items/{item_id}/cancel",
    tag = "Bookings",
    params(
        ("id" = i32, Path, description = "Booking id"),
        ("item_id" = i32, Path, description = "Booking item id")
    ),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Item cancelled", body = ApiResponse<CancelResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Item already cancelled or booking past reserved")
    )
)]
pub async fn cancel_booking_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<CancelRequest>,
) -> ApiResult<CancelResponse> {
    let outcome = state
        .bookings
        .cancel_item(id, item_id, &request.reason, &actor)
        .await?;
    Ok(Json(ApiResponse::success(CancelResponse {
        booking: BookingDto::new(&outcome.booking, &state.status_codes),
        refund_due: outcome.refund_due,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/items/{item_id}/change-room",
    tag = "Bookings",
    params(
        ("id" = i32, Path, description = "Booking id"),
        ("item_id" = i32, Path, description = "Booking item id")
    ),
    request_body = ChangeRoomRequest,
    responses(
        (status = 200, description = "Item moved and re-priced", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Target room taken or booking closed"),
        (status = 422, description = "Nothing to change or invalid dates")
    )
)]
pub async fn change_room(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<ChangeRoomRequest>,
) -> ApiResult<BookingDto> {
    let range = match (request.check_in, request.check_out) {
        (Some(check_in), Some(check_out)) => Some(DateRange::new(check_in, check_out)?),
        (None, None) => None,
        _ => {
            return Err(DomainError::Validation(
                "check_in and check_out must be given together".into(),
            )
            .into())
        }
    };
    let booking = state
        .bookings
        .change_room(id, item_id, request.new_room_id, range, &actor)
        .await?;
    Ok(Json(ApiResponse::success(BookingDto::new(&booking, &state.status_codes))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/check-in",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Guest checked in", body = ApiResponse<BookingDto>),
        (status = 409, description = "Booking is not reserved"),
        (status = 422, description = "Before the check-in date")
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
) -> ApiResult<BookingDto> {
    let booking = state.bookings.check_in(id, &actor).await?;
    Ok(Json(ApiResponse::success(BookingDto::new(&booking, &state.status_codes))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/check-out",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Guest checked out", body = ApiResponse<BookingDto>),
        (status = 409, description = "Booking is not checked in")
    )
)]
pub async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<CheckOutRequest>,
) -> ApiResult<BookingDto> {
    let booking = state
        .bookings
        .check_out(id, &actor, request.inspection_passed)
        .await?;
    Ok(Json(ApiResponse::success(BookingDto::new(&booking, &state.status_codes))))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/incidents",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = IncidentRequest,
    responses(
        (status = 201, description = "Charge recorded, settled at check-out", body = ApiResponse<IncidentDto>),
        (status = 409, description = "Booking is not checked in")
    )
)]
pub async fn add_incident_charge(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<IncidentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IncidentDto>>), ApiError> {
    let charge = state
        .bookings
        .add_incident_charge(id, &request.description, request.amount, &actor)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(IncidentDto::from(&charge))),
    ))
}
