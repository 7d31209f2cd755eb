//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: read repositories plus the entry point for writes
//! - `UnitOfWork`: one database transaction spanning a lifecycle transition
//! - `DomainResult`: standard result type for domain operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::availability::RoomHold;
use super::booking::{Booking, BookingRepository, IncidentCharge};
use super::calendar::DateRange;
use super::discount::{DiscountCode, DiscountRepository};
use super::refund::{RefundRepository, RefundRequest};
use super::room::{CatalogRepository, HotelService, Room, RoomStatus, RoomType};
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Reads that do not feed a write go through the per-aggregate
/// repositories. Every state change opens a unit of work:
///
/// ```ignore
/// let mut uow = repos.begin().await?;
/// let mut booking = uow.booking(id).await?.ok_or(...)?;
/// booking.transition(StayStatus::Reserved, now)?;
/// uow.update_booking(&booking).await?;
/// uow.commit().await?;
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn catalog(&self) -> &dyn CatalogRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn discounts(&self) -> &dyn DiscountRepository;
    fn refunds(&self) -> &dyn RefundRepository;

    /// Opens a transaction. Dropping the returned unit without calling
    /// `commit` rolls it back.
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>>;
}

// ── UnitOfWork ──────────────────────────────────────────────────

/// Transactional view of the store. Reads lock the rows they return on
/// backends that support `SELECT ... FOR UPDATE`.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    // Catalog
    async fn room(&self, id: i32) -> DomainResult<Option<Room>>;
    async fn room_type(&self, id: i32) -> DomainResult<Option<RoomType>>;
    async fn service(&self, id: i32) -> DomainResult<Option<HotelService>>;
    async fn set_room_status(&self, room_id: i32, status: RoomStatus) -> DomainResult<()>;

    // Availability
    /// Non-cancelled items on `room_id` whose booking is not terminal,
    /// restricted to those overlapping `range` when given.
    async fn room_holds(&self, room_id: i32, range: Option<DateRange>) -> DomainResult<Vec<RoomHold>>;

    // Bookings
    async fn booking(&self, id: i32) -> DomainResult<Option<Booking>>;
    /// Inserts the booking with its items and services; returns it with ids.
    async fn insert_booking(&self, booking: &Booking) -> DomainResult<Booking>;
    /// Writes header fields, items and incident settlement flags.
    async fn update_booking(&self, booking: &Booking) -> DomainResult<()>;
    async fn insert_incident(
        &self,
        booking_id: i32,
        description: &str,
        amount: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<IncidentCharge>;
    async fn non_terminal_bookings(&self) -> DomainResult<Vec<Booking>>;

    // Discounts
    async fn discount(&self, code: &str) -> DomainResult<Option<DiscountCode>>;
    async fn count_discount_uses(&self, code: &str, customer_id: i32) -> DomainResult<u64>;
    /// Appends to the usage ledger and bumps the code's counter.
    async fn record_discount_usage(
        &self,
        code: &str,
        customer_id: Option<i32>,
        booking_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<()>;

    // Refunds
    async fn refund(&self, id: i32) -> DomainResult<Option<RefundRequest>>;
    async fn open_refund_for(&self, booking_id: i32) -> DomainResult<Option<RefundRequest>>;
    /// Sum of amounts of non-rejected requests for the booking.
    async fn requested_refund_total(&self, booking_id: i32) -> DomainResult<i64>;
    async fn insert_refund(&self, request: &RefundRequest) -> DomainResult<RefundRequest>;
    async fn update_refund(&self, request: &RefundRequest) -> DomainResult<()>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;
}
