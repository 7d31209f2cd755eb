//! Domain error to HTTP response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::shared::DomainError;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
            DomainError::RoomUnavailable { .. } => StatusCode::CONFLICT,
            DomainError::DiscountRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::MissingReceipt { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            DomainError::Storage(detail) => {
                error!(error = %detail, "Storage failure while handling request");
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };
        let mut response = (status, Json(ApiResponse::<()>::error(message))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert("retry-after", axum::http::HeaderValue::from_static("1"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::DiscountRejection;

    #[test]
    fn maps_each_variant() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let cases = [
            (DomainError::not_found("booking", 1), 404),
            (DomainError::Validation("x".into()), 422),
            (DomainError::Conflict("x".into()), 409),
            (
                DomainError::InvalidTransition {
                    entity: "booking",
                    id: 1,
                    from: "checked_out".into(),
                    to: "checked_in".into(),
                },
                409,
            ),
            (
                DomainError::RoomUnavailable {
                    room_id: 1,
                    check_in: date,
                    check_out: date,
                },
                409,
            ),
            (DomainError::DiscountRejected(DiscountRejection::Expired), 422),
            (DomainError::MissingReceipt { refund_id: 3 }, 422),
            (DomainError::Busy("room:1".into()), 503),
            (DomainError::Storage("disk".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError(err).status().as_u16(), code);
        }
    }

    #[test]
    fn storage_detail_is_not_leaked() {
        let response = ApiError(DomainError::Storage("table bookings is locked".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn busy_asks_client_to_retry() {
        let response = ApiError(DomainError::Busy("booking:4".into())).into_response();
        assert_eq!(response.headers()["retry-after"], "1");
    }
}
