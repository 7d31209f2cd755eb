//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_catalog;
mod m20250101_000002_create_bookings;
mod m20250101_000003_create_discounts;
mod m20250101_000004_create_refund_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog::Migration),
            Box::new(m20250101_000002_create_bookings::Migration),
            Box::new(m20250101_000003_create_discounts::Migration),
            Box::new(m20250101_000004_create_refund_requests::Migration),
        ]
    }
}
