//! Refund workflow handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    CompleteRefundRequest, ListRefundsQuery, OpenRefundRequest, RefundDto, ReviewRefundRequest,
};
use crate::domain::{DomainError, RefundStatus};
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, RequestActor, ValidatedJson};
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/refunds",
    tag = "Refunds",
    request_body = OpenRefundRequest,
    responses(
        (status = 201, description = "Refund request opened", body = ApiResponse<RefundDto>),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Nothing refundable, unpaid, or a request is already open"),
        (status = 422, description = "Amount out of range")
    )
)]
pub async fn open_refund(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<OpenRefundRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RefundDto>>), ApiError> {
    let refund = state.refunds.open(request.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(refund.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/refunds",
    tag = "Refunds",
    params(ListRefundsQuery),
    responses(
        (status = 200, description = "Refund requests, newest first", body = ApiResponse<Vec<RefundDto>>),
        (status = 422, description = "Unknown status")
    )
)]
pub async fn list_refunds(
    State(state): State<AppState>,
    Query(query): Query<ListRefundsQuery>,
) -> ApiResult<Vec<RefundDto>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RefundStatus>)
        .transpose()
        .map_err(DomainError::Validation)?;
    let refunds = state.refunds.list(status, query.booking_id).await?;
    Ok(Json(ApiResponse::success(
        refunds.into_iter().map(RefundDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/refunds/{id}",
    tag = "Refunds",
    params(("id" = i32, Path, description = "Refund request id")),
    responses(
        (status = 200, description = "Refund request", body = ApiResponse<RefundDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_refund(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<RefundDto> {
    let refund = state.refunds.get(id).await?;
    Ok(Json(ApiResponse::success(refund.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/refunds/{id}/approve",
    tag = "Refunds",
    params(("id" = i32, Path, description = "Refund request id")),
    request_body = ReviewRefundRequest,
    responses(
        (status = 200, description = "Approved", body = ApiResponse<RefundDto>),
        (status = 409, description = "Not pending")
    )
)]
pub async fn approve_refund(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<ReviewRefundRequest>,
) -> ApiResult<RefundDto> {
    let refund = state.refunds.approve(id, request.notes, &actor).await?;
    Ok(Json(ApiResponse::success(refund.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/refunds/{id}/reject",
    tag = "Refunds",
    params(("id" = i32, Path, description = "Refund request id")),
    request_body = ReviewRefundRequest,
    responses(
        (status = 200, description = "Rejected", body = ApiResponse<RefundDto>),
        (status = 409, description = "Not pending")
    )
)]
pub async fn reject_refund(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<ReviewRefundRequest>,
) -> ApiResult<RefundDto> {
    let refund = state.refunds.reject(id, request.notes, &actor).await?;
    Ok(Json(ApiResponse::success(refund.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/refunds/{id}/complete",
    tag = "Refunds",
    params(("id" = i32, Path, description = "Refund request id")),
    request_body = CompleteRefundRequest,
    responses(
        (status = 200, description = "Money sent; booking payment status updated", body = ApiResponse<RefundDto>),
        (status = 409, description = "Not approved"),
        (status = 422, description = "Receipt reference missing")
    )
)]
pub async fn complete_refund(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequestActor(actor): RequestActor,
    ValidatedJson(request): ValidatedJson<CompleteRefundRequest>,
) -> ApiResult<RefundDto> {
    let refund = state
        .refunds
        .complete(id, request.receipt_ref, &actor)
        .await?;
    Ok(Json(ApiResponse::success(refund.into())))
}
