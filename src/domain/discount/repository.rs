//! Discount repository interface (read side)
//!
//! Usage bookkeeping happens inside the payment transaction, see
//! `UnitOfWork::record_discount_usage`.

use async_trait::async_trait;

use super::model::{DiscountCode, DiscountUsage};
use crate::domain::DomainResult;

#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Codes are matched case-insensitively
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<DiscountCode>>;

    async fn count_uses_by_customer(&self, code: &str, customer_id: i32) -> DomainResult<u64>;

    async fn list_usages(&self, code: &str) -> DomainResult<Vec<DiscountUsage>>;
}
