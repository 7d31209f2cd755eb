//! Pricing service
//!
//! Prices prospective bookings against the catalog and evaluates discount
//! codes. Nothing here writes; the booking service reuses `price_lines` and
//! `evaluate_discount` when it creates a booking.

use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{BookingItem, BookingServiceLine};
use crate::domain::discount::{DiscountCode, DiscountRejection, DiscountType};
use crate::domain::pricing::{price_item, service_total, ItemPrice};
use crate::domain::room::CatalogRepository;
use crate::domain::{DateRange, DomainError, DomainResult, RepositoryProvider, StayPolicy};
use crate::shared::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub room_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub service_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedItem {
    pub room_id: i32,
    pub room_number: String,
    pub room_type_id: i32,
    pub room_type_name: String,
    pub range: DateRange,
    pub adults: i32,
    pub children: i32,
    pub price: ItemPrice,
}

impl PricedItem {
    /// Unsaved booking line carrying this price.
    pub fn to_booking_item(&self) -> BookingItem {
        let rate = &self.price.rate;
        BookingItem {
            id: 0,
            booking_id: 0,
            room_id: self.room_id,
            check_in: self.range.check_in,
            check_out: self.range.check_out,
            adults: self.adults,
            children: self.children,
            nightly_price: rate.nightly_price,
            extra_adult_fee: rate.extra_adult_fee * rate.extra_adults,
            extra_child_fee: rate.extra_child_fee * rate.extra_children,
            nights: i32::try_from(self.price.nights).unwrap_or(i32::MAX),
            item_total: self.price.item_total,
            cancelled_at: None,
            cancel_reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedService {
    pub service_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub total: i64,
}

impl PricedService {
    pub fn to_line(&self) -> BookingServiceLine {
        BookingServiceLine {
            id: 0,
            booking_id: 0,
            service_id: self.service_id,
            name: self.name.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedLines {
    pub items: Vec<PricedItem>,
    pub services: Vec<PricedService>,
    /// Items plus services
    pub subtotal: i64,
}

/// Prices every requested line from the catalog.
///
/// Fails on unknown rooms or services, inverted ranges, occupancy above the
/// room type's limits, and two requested stays overlapping on one room.
pub(crate) async fn price_lines(
    catalog: &dyn CatalogRepository,
    items: &[ItemRequest],
    services: &[ServiceRequest],
) -> DomainResult<PricedLines> {
    if items.is_empty() {
        return Err(DomainError::Validation(
            "a booking needs at least one room".into(),
        ));
    }

    let mut priced = Vec::with_capacity(items.len());
    for req in items {
        let range = DateRange::new(req.check_in, req.check_out)?;
        let room = catalog
            .find_room(req.room_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room", req.room_id))?;
        let room_type = catalog
            .find_room_type(room.room_type_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room_type", room.room_type_id))?;

        if let Some(clash) = priced
            .iter()
            .find(|p: &&PricedItem| p.room_id == room.id && p.range.overlaps(&range))
        {
            return Err(DomainError::Validation(format!(
                "room {} is requested twice for overlapping dates ({} and {})",
                room.room_number, clash.range, range
            )));
        }

        let price = price_item(&room_type, &range, req.adults, req.children)?;
        priced.push(PricedItem {
            room_id: room.id,
            room_number: room.room_number,
            room_type_id: room_type.id,
            room_type_name: room_type.name,
            range,
            adults: req.adults,
            children: req.children,
            price,
        });
    }

    let mut lines = Vec::with_capacity(services.len());
    for req in services {
        if req.quantity < 1 {
            return Err(DomainError::Validation(format!(
                "service {} quantity must be at least 1",
                req.service_id
            )));
        }
        let service = catalog
            .find_service(req.service_id)
            .await?
            .ok_or_else(|| DomainError::not_found("service", req.service_id))?;
        if !service.is_active {
            return Err(DomainError::Validation(format!(
                "service '{}' is not offered",
                service.name
            )));
        }
        lines.push(PricedService {
            service_id: service.id,
            total: service_total(service.price, req.quantity),
            name: service.name,
            unit_price: service.price,
            quantity: req.quantity,
        });
    }

    let subtotal = priced.iter().map(|p| p.price.item_total).sum::<i64>()
        + lines.iter().map(|s| s.total).sum::<i64>();

    Ok(PricedLines {
        items: priced,
        services: lines,
        subtotal,
    })
}

/// Discount for `subtotal`, or the reason the code is refused.
pub(crate) fn evaluate_discount(
    code: Option<DiscountCode>,
    subtotal: i64,
    today: NaiveDate,
    uses_by_customer: Option<u64>,
) -> DomainResult<(DiscountCode, i64)> {
    let code = code.ok_or(DomainError::DiscountRejected(DiscountRejection::UnknownCode))?;
    let amount = code
        .evaluate(subtotal, today, uses_by_customer)
        .map_err(DomainError::DiscountRejected)?;
    Ok((code, amount))
}

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub customer_id: Option<i32>,
    pub items: Vec<ItemRequest>,
    pub services: Vec<ServiceRequest>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    #[serde(flatten)]
    pub lines: PricedLines,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_amount: i64,
    pub total_after: i64,
}

pub struct PricingService {
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    policy: StayPolicy,
}

impl PricingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: Arc<dyn Clock>, policy: StayPolicy) -> Self {
        Self {
            repos,
            clock,
            policy,
        }
    }

    /// Prices a prospective booking without reserving anything.
    pub async fn quote(&self, request: &QuoteRequest) -> DomainResult<Quote> {
        let lines = price_lines(self.repos.catalog(), &request.items, &request.services).await?;

        let (discount_code, discount_amount) = match request.discount_code.as_deref() {
            Some(code) => {
                let applied = self
                    .apply_discount(code, lines.subtotal, request.customer_id)
                    .await?;
                (Some(applied.code), applied.discount_amount)
            }
            None => (None, 0),
        };

        debug!(
            "Quoted {} items, subtotal {}, discount {}",
            lines.items.len(),
            lines.subtotal,
            discount_amount
        );

        Ok(Quote {
            total: lines.subtotal - discount_amount,
            lines,
            discount_code,
            discount_amount,
        })
    }

    /// Checks `code` against `subtotal` for `customer_id` as of today in
    /// hotel time. Usage is only recorded when a booking is paid.
    pub async fn apply_discount(
        &self,
        code: &str,
        subtotal: i64,
        customer_id: Option<i32>,
    ) -> DomainResult<AppliedDiscount> {
        if subtotal < 0 {
            return Err(DomainError::Validation("total cannot be negative".into()));
        }
        let found = self.repos.discounts().find_by_code(code).await?;
        let uses = match (customer_id, found.as_ref()) {
            (Some(customer), Some(found)) => Some(
                self.repos
                    .discounts()
                    .count_uses_by_customer(&found.code, customer)
                    .await?,
            ),
            _ => None,
        };
        let today = self.policy.calendar.local_date(self.clock.now());
        let (code, discount_amount) = evaluate_discount(found, subtotal, today, uses)?;

        Ok(AppliedDiscount {
            code: code.code,
            discount_type: code.discount_type,
            discount_amount,
            total_after: subtotal - discount_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
    use crate::infrastructure::database::seed::{ROOM_101, ROOM_201, SERVICE_BREAKFAST};
    use crate::infrastructure::database::test_database;
    use crate::shared::FixedClock;
    use chrono::{TimeZone, Utc};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    async fn service() -> PricingService {
        let repos = Arc::new(SeaOrmRepositoryProvider::new(test_database().await));
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 5, 20, 3, 0, 0).unwrap(),
        ));
        PricingService::new(repos, clock, StayPolicy::default())
    }

    fn stay(room_id: i32, adults: i32, children: i32) -> ItemRequest {
        ItemRequest {
            room_id,
            check_in: d(6, 1),
            check_out: d(6, 3),
            adults,
            children,
        }
    }

    #[tokio::test]
    async fn quote_adds_surcharges_services_and_discount() {
        let svc = service().await;
        let quote = svc
            .quote(&QuoteRequest {
                customer_id: Some(9),
                items: vec![stay(ROOM_101, 3, 1)],
                services: vec![ServiceRequest {
                    service_id: SERVICE_BREAKFAST,
                    quantity: 2,
                }],
                discount_code: Some("summer20".into()),
            })
            .await
            .unwrap();

        // (1,000,000 + 200,000 + 100,000) x 2 nights + 2 x 150,000
        assert_eq!(quote.lines.items[0].price.rate.nightly_price, 1_300_000);
        assert_eq!(quote.lines.subtotal, 2_900_000);
        assert_eq!(quote.discount_amount, 500_000);
        assert_eq!(quote.total, 2_400_000);
        assert_eq!(quote.discount_code.as_deref(), Some("SUMMER20"));
    }

    #[tokio::test]
    async fn percent_code_is_capped_on_large_totals() {
        let svc = service().await;
        let applied = svc.apply_discount("SUMMER20", 3_000_000, None).await.unwrap();
        assert_eq!(applied.discount_amount, 500_000);
        assert_eq!(applied.total_after, 2_500_000);
    }

    #[tokio::test]
    async fn fixed_code_never_exceeds_total() {
        let svc = service().await;
        let applied = svc.apply_discount("WELCOME", 300_000, Some(1)).await.unwrap();
        assert_eq!(applied.discount_amount, 300_000);
        assert_eq!(applied.total_after, 0);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let svc = service().await;
        let err = svc.apply_discount("NOPE", 1_000, None).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::DiscountRejected(DiscountRejection::UnknownCode)
        ));
    }

    #[tokio::test]
    async fn over_occupancy_and_duplicate_rooms_are_refused() {
        let svc = service().await;
        let too_many = QuoteRequest {
            customer_id: None,
            items: vec![stay(ROOM_101, 4, 0)],
            services: vec![],
            discount_code: None,
        };
        assert!(matches!(
            svc.quote(&too_many).await,
            Err(DomainError::Validation(_))
        ));

        let twice = QuoteRequest {
            items: vec![stay(ROOM_201, 2, 0), stay(ROOM_201, 2, 0)],
            ..too_many
        };
        assert!(matches!(svc.quote(&twice).await, Err(DomainError::Validation(_))));
    }
}
