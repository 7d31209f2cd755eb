//! Pricing handlers. Read only: nothing here holds a room or spends a code.

use axum::extract::State;
use axum::Json;

use super::dto::{AppliedDiscountDto, ApplyDiscountRequest, QuoteDto, QuoteRequestBody};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    tag = "Pricing",
    request_body = QuoteRequestBody,
    responses(
        (status = 200, description = "Priced lines, discount and total", body = ApiResponse<QuoteDto>),
        (status = 404, description = "Room, room type or service not found"),
        (status = 422, description = "Invalid request or discount rejected")
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<QuoteRequestBody>,
) -> ApiResult<QuoteDto> {
    let quote = state.pricing.quote(&request.into()).await?;
    Ok(Json(ApiResponse::success(quote.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/discounts/apply",
    tag = "Pricing",
    request_body = ApplyDiscountRequest,
    responses(
        (status = 200, description = "Discount the code gives on the subtotal", body = ApiResponse<AppliedDiscountDto>),
        (status = 422, description = "Code unknown, expired, exhausted or below minimum")
    )
)]
pub async fn apply_discount(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ApplyDiscountRequest>,
) -> ApiResult<AppliedDiscountDto> {
    let applied = state
        .pricing
        .apply_discount(&request.code, request.subtotal, request.customer_id)
        .await?;
    Ok(Json(ApiResponse::success(applied.into())))
}
