//! SeaORM implementation of RefundRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::convert::{db_err, refund_to_domain};
use crate::domain::refund::{RefundRepository, RefundRequest, RefundStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::refund_request;

pub struct SeaOrmRefundRepository {
    db: DatabaseConnection,
}

impl SeaOrmRefundRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefundRepository for SeaOrmRefundRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<RefundRequest>> {
        refund_request::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(refund_to_domain)
            .transpose()
    }

    async fn list(
        &self,
        status: Option<RefundStatus>,
        booking_id: Option<i32>,
    ) -> DomainResult<Vec<RefundRequest>> {
        let mut query = refund_request::Entity::find().order_by_desc(refund_request::Column::Id);
        if let Some(status) = status {
            query = query.filter(refund_request::Column::Status.eq(status.as_str()));
        }
        if let Some(booking_id) = booking_id {
            query = query.filter(refund_request::Column::BookingId.eq(booking_id));
        }
        query
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(refund_to_domain)
            .collect()
    }
}
