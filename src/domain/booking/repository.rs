//! Booking repository interface (read side)

use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::Booking;
use crate::domain::status::StayStatus;
use crate::domain::DomainResult;
use crate::shared::{PaginatedResult, PaginationParams};

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub stay_status: Option<StayStatus>,
    /// Bookings with an active item whose stay covers this date
    pub date: Option<NaiveDate>,
    pub customer_id: Option<i32>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>>;

    /// Newest first
    async fn list(
        &self,
        filter: &BookingFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>>;
}
