//! SeaORM implementation of DiscountRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use super::convert::{db_err, discount_to_domain, usage_to_domain};
use crate::domain::discount::{DiscountCode, DiscountRepository, DiscountUsage};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{discount_code, discount_usage};

pub struct SeaOrmDiscountRepository {
    db: DatabaseConnection,
}

impl SeaOrmDiscountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DiscountRepository for SeaOrmDiscountRepository {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<DiscountCode>> {
        discount_code::Entity::find()
            .filter(discount_code::Column::Code.eq(code.trim().to_uppercase()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(discount_to_domain)
            .transpose()
    }

    async fn count_uses_by_customer(&self, code: &str, customer_id: i32) -> DomainResult<u64> {
        discount_usage::Entity::find()
            .filter(discount_usage::Column::Code.eq(code.trim().to_uppercase()))
            .filter(discount_usage::Column::CustomerId.eq(customer_id))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn list_usages(&self, code: &str) -> DomainResult<Vec<DiscountUsage>> {
        let models = discount_usage::Entity::find()
            .filter(discount_usage::Column::Code.eq(code.trim().to_uppercase()))
            .order_by_desc(discount_usage::Column::UsedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(usage_to_domain).collect())
    }
}
