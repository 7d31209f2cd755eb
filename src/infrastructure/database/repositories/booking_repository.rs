//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::convert::{db_err, load_bookings};
use crate::domain::booking::{Booking, BookingFilter, BookingRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{booking, booking_item};
use crate::shared::{PaginatedResult, PaginationParams};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        let Some(model) = booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Ok(load_bookings(&self.db, vec![model]).await?.pop())
    }

    async fn list(
        &self,
        filter: &BookingFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        debug!("Listing bookings: {:?} page={} limit={}", filter, page.page, page.limit);

        let mut query = booking::Entity::find().order_by_desc(booking::Column::Id);

        if let Some(status) = filter.stay_status {
            query = query.filter(booking::Column::StayStatus.eq(status.as_str()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(booking::Column::CustomerId.eq(customer_id));
        }
        if let Some(date) = filter.date {
            let ids: Vec<i32> = booking_item::Entity::find()
                .select_only()
                .column(booking_item::Column::BookingId)
                .filter(booking_item::Column::CancelledAt.is_null())
                .filter(booking_item::Column::CheckIn.lte(date))
                .filter(booking_item::Column::CheckOut.gt(date))
                .distinct()
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(db_err)?;
            query = query.filter(booking::Column::Id.is_in(ids));
        }

        let paginator = query.paginate(&self.db, u64::from(page.limit));
        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(db_err)?;

        let items = load_bookings(&self.db, models).await?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }
}
