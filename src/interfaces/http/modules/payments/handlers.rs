//! Payment confirmation
//!
//! The gateway adapter has already verified the transaction by the time it
//! calls here; this endpoint only moves the booking from pending to
//! reserved.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::modules::bookings::BookingDto;
use crate::interfaces::http::router::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub booking_id: i32,
    /// Gateway or channel, e.g. `vnpay`, `cash`
    #[validate(length(min = 1, max = 50))]
    pub method: String,
    /// Amount received in the smallest currency unit
    #[validate(range(min = 0))]
    pub amount: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/confirmations",
    tag = "Payments",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Booking reserved", body = ApiResponse<BookingDto>),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking not pending or its room was taken meanwhile"),
        (status = 422, description = "Amount below the booking total")
    )
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ConfirmPaymentRequest>,
) -> ApiResult<BookingDto> {
    info!(
        booking_id = request.booking_id,
        method = %request.method,
        amount = request.amount,
        "Payment confirmation received"
    );
    let booking = state
        .bookings
        .confirm_payment(request.booking_id, &request.method, request.amount)
        .await?;
    Ok(Json(ApiResponse::success(BookingDto::new(
        &booking,
        &state.status_codes,
    ))))
}
