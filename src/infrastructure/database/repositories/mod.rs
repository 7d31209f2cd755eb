//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories, the transactional unit of work and the
//! unified RepositoryProvider.

pub mod booking_repository;
pub mod catalog_repository;
mod convert;
pub mod discount_repository;
pub mod refund_repository;
pub mod repository_provider;
pub mod unit_of_work;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use unit_of_work::SeaOrmUnitOfWork;
