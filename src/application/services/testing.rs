//! Shared fixtures for service tests: an in-memory store with the demo
//! catalog, a pinned clock and a subscriber on the event bus.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;

use super::availability::AvailabilityService;
use super::booking::{BookingService, CreateBooking};
use super::pricing::{ItemRequest, PricingService};
use super::refund::RefundService;
use super::scheduler::{SchedulerConfig, StayScheduler};
use crate::application::locks::LockRegistry;
use crate::domain::{Booking, BookingMethod, DomainResult, RepositoryProvider, RoomStatus, StayPolicy};
use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
use crate::infrastructure::database::test_database;
use crate::notifications::{create_event_bus, EventSubscriber, SharedEventBus};
use crate::shared::FixedClock;

pub(crate) fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

/// 10:00 hotel time on 2025-05-20.
pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 3, 0, 0).unwrap()
}

pub(crate) struct Harness {
    pub db: DatabaseConnection,
    pub repos: Arc<dyn RepositoryProvider>,
    pub clock: Arc<FixedClock>,
    pub bus: SharedEventBus,
    pub events: EventSubscriber,
    pub locks: Arc<LockRegistry>,
    pub bookings: Arc<BookingService>,
}

impl Harness {
    pub async fn new() -> Self {
        let db = test_database().await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let clock = Arc::new(FixedClock::new(start()));
        let bus = create_event_bus();
        let events = bus.subscribe();
        let locks = Arc::new(LockRegistry::new(Duration::from_secs(5)));
        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            locks.clone(),
            bus.clone(),
            clock.clone(),
            StayPolicy::default(),
        ));
        Self {
            db,
            repos,
            clock,
            bus,
            events,
            locks,
            bookings,
        }
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(self.repos.clone(), self.clock.clone(), StayPolicy::default())
    }

    pub fn pricing(&self) -> PricingService {
        PricingService::new(self.repos.clone(), self.clock.clone(), StayPolicy::default())
    }

    pub fn refunds(&self) -> RefundService {
        RefundService::new(
            self.repos.clone(),
            self.locks.clone(),
            self.bus.clone(),
            self.clock.clone(),
        )
    }

    pub fn scheduler(&self) -> StayScheduler {
        StayScheduler::new(
            self.bookings.clone(),
            self.repos.clone(),
            self.locks.clone(),
            self.clock.clone(),
            SchedulerConfig::default(),
        )
    }

    /// Two adults, one room, online.
    pub fn request(customer_id: i32, room_id: i32, check_in: NaiveDate, check_out: NaiveDate) -> CreateBooking {
        CreateBooking {
            customer_id: Some(customer_id),
            guest_name: String::new(),
            booking_method: BookingMethod::Online,
            items: vec![ItemRequest {
                room_id,
                check_in,
                check_out,
                adults: 2,
                children: 0,
            }],
            services: vec![],
            discount_code: None,
        }
    }

    pub async fn book(&self, room_id: i32, check_in: NaiveDate, check_out: NaiveDate) -> DomainResult<Booking> {
        self.bookings
            .create(Self::request(1, room_id, check_in, check_out))
            .await
    }

    pub async fn book_paid(&self, room_id: i32, check_in: NaiveDate, check_out: NaiveDate) -> Booking {
        let booking = self.book(room_id, check_in, check_out).await.unwrap();
        self.bookings
            .confirm_payment(booking.id, "vnpay", booking.total_price)
            .await
            .unwrap()
    }

    pub async fn room_status(&self, room_id: i32) -> RoomStatus {
        self.repos
            .catalog()
            .find_room(room_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }
}
