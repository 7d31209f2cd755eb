//! Refund request repository interface (read side)

use async_trait::async_trait;

use super::model::{RefundRequest, RefundStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<RefundRequest>>;

    /// Newest first, optionally filtered
    async fn list(
        &self,
        status: Option<RefundStatus>,
        booking_id: Option<i32>,
    ) -> DomainResult<Vec<RefundRequest>>;
}
