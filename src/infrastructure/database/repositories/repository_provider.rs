//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::discount::DiscountRepository;
use crate::domain::refund::RefundRepository;
use crate::domain::repositories::{RepositoryProvider, UnitOfWork};
use crate::domain::room::CatalogRepository;
use crate::domain::DomainResult;

use super::booking_repository::SeaOrmBookingRepository;
use super::catalog_repository::SeaOrmCatalogRepository;
use super::discount_repository::SeaOrmDiscountRepository;
use super::refund_repository::SeaOrmRefundRepository;
use super::unit_of_work::SeaOrmUnitOfWork;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let room = repos.catalog().find_room(101).await?;
/// let mut uow = repos.begin().await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    catalog: SeaOrmCatalogRepository,
    bookings: SeaOrmBookingRepository,
    discounts: SeaOrmDiscountRepository,
    refunds: SeaOrmRefundRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            catalog: SeaOrmCatalogRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            discounts: SeaOrmDiscountRepository::new(db.clone()),
            refunds: SeaOrmRefundRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn catalog(&self) -> &dyn CatalogRepository {
        &self.catalog
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn discounts(&self) -> &dyn DiscountRepository {
        &self.discounts
    }

    fn refunds(&self) -> &dyn RefundRepository {
        &self.refunds
    }

    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(SeaOrmUnitOfWork::begin(&self.db).await?))
    }
}
