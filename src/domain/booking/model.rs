//! Booking aggregate
//!
//! A booking owns its room items, service lines and incident charges. All
//! lifecycle changes go through `Booking::transition` so the status table in
//! `domain::status` is the only place legal moves are defined.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calendar::{DateRange, HotelCalendar};
use crate::domain::pricing::{allocate, refund_for};
use crate::domain::room::RefundPolicy;
use crate::domain::status::StayStatus;
use crate::domain::DomainResult;
use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Partial,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::Partial => "partial",
        }
    }

    pub fn has_funds(&self) -> bool {
        matches!(self, Self::Paid | Self::Partial)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            "partial" => Ok(Self::Partial),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMethod {
    Online,
    /// Front desk / walk-in
    Offline,
}

impl BookingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for BookingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown booking method '{other}'")),
        }
    }
}

/// Who triggered a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    System,
    Staff(String),
    Customer(i32),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Staff(name) => write!(f, "staff:{name}"),
            Self::Customer(id) => write!(f, "customer:{id}"),
        }
    }
}

impl FromStr for Actor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "system" => Ok(Self::System),
            Some(("staff", name)) if !name.is_empty() => Ok(Self::Staff(name.to_string())),
            Some(("customer", id)) => id
                .parse()
                .map(Self::Customer)
                .map_err(|_| format!("invalid customer id in actor '{s}'")),
            _ => Err(format!("unknown actor '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingItem {
    pub id: i32,
    pub booking_id: i32,
    pub room_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub nightly_price: i64,
    /// Per night, already multiplied by the number of extra adults
    pub extra_adult_fee: i64,
    /// Per night, already multiplied by the number of extra children
    pub extra_child_fee: i64,
    pub nights: i32,
    pub item_total: i64,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl BookingItem {
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingServiceLine {
    pub id: i32,
    pub booking_id: i32,
    pub service_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub total: i64,
}

/// Damage, minibar and similar charges raised during a stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentCharge {
    pub id: i32,
    pub booking_id: i32,
    pub description: String,
    pub amount: i64,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i32,
    pub customer_id: Option<i32>,
    pub guest_name: String,
    pub stay_status: StayStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub booking_method: BookingMethod,
    /// Items plus services, before discount
    pub subtotal: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total_price: i64,
    pub paid_amount: i64,
    pub refundable_amount: i64,
    pub cancel_reason: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<BookingItem>,
    pub services: Vec<BookingServiceLine>,
    pub incidents: Vec<IncidentCharge>,
}

impl Booking {
    /// An unsaved booking in `pending`. Ids are assigned on insert.
    pub fn draft(
        customer_id: Option<i32>,
        guest_name: impl Into<String>,
        booking_method: BookingMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            customer_id,
            guest_name: guest_name.into(),
            stay_status: StayStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            booking_method,
            subtotal: 0,
            discount_code: None,
            discount_amount: 0,
            total_price: 0,
            paid_amount: 0,
            refundable_amount: 0,
            cancel_reason: None,
            canceled_at: None,
            canceled_by: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
            services: Vec::new(),
            incidents: Vec::new(),
        }
    }

    pub fn active_items(&self) -> impl Iterator<Item = &BookingItem> {
        self.items.iter().filter(|i| i.is_active())
    }

    /// Distinct rooms held by active items, ascending.
    pub fn active_room_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.active_items().map(|i| i.room_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn item(&self, item_id: i32) -> DomainResult<&BookingItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "booking_item",
                field: "id",
                value: item_id.to_string(),
            })
    }

    pub fn item_mut(&mut self, item_id: i32) -> DomainResult<&mut BookingItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "booking_item",
                field: "id",
                value: item_id.to_string(),
            })
    }

    pub fn earliest_check_in(&self) -> Option<NaiveDate> {
        self.active_items().map(|i| i.check_in).min()
    }

    /// Moves to `to` if the status table allows it. Returns the previous status.
    pub fn transition(&mut self, to: StayStatus, now: DateTime<Utc>) -> DomainResult<StayStatus> {
        let from = self.stay_status;
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                entity: "booking",
                id: self.id,
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.stay_status = to;
        self.updated_at = now;
        Ok(from)
    }

    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> DomainResult<StayStatus> {
        let from = self.transition(StayStatus::Cancelled, now)?;
        self.cancel_reason = Some(reason.into());
        self.canceled_at = Some(now);
        self.canceled_by = Some(actor.to_string());
        Ok(from)
    }

    pub fn settled_incidents(&self) -> i64 {
        self.incidents
            .iter()
            .filter(|c| c.settled)
            .map(|c| c.amount)
            .sum()
    }

    /// Re-derives subtotal and total from the active lines. The stored
    /// discount never exceeds what is left to discount.
    pub fn recompute_totals(&mut self) {
        let items: i64 = self.active_items().map(|i| i.item_total).sum();
        let services: i64 = self.services.iter().map(|s| s.total).sum();
        self.subtotal = items + services;
        self.discount_amount = self.discount_amount.clamp(0, self.subtotal);
        self.total_price = self.subtotal - self.discount_amount + self.settled_incidents();
    }

    pub fn outstanding(&self) -> i64 {
        (self.total_price - self.paid_amount).max(0)
    }

    /// Refund owed for cancelling `item_ids` at `now`.
    ///
    /// The paid amount is spread over all items in proportion to their
    /// totals, and each item's share is run through the refund policy of its
    /// room type (`policies` is keyed by item id).
    pub fn refund_due(
        &self,
        item_ids: &[i32],
        policies: &HashMap<i32, RefundPolicy>,
        calendar: &HotelCalendar,
        now: DateTime<Utc>,
    ) -> i64 {
        if !self.payment_status.has_funds() {
            return 0;
        }
        let weights: Vec<i64> = self.items.iter().map(|i| i.item_total).collect();
        let shares = allocate(self.paid_amount, &weights);

        self.items
            .iter()
            .zip(shares)
            .filter(|(item, _)| item_ids.contains(&item.id))
            .map(|(item, share)| match policies.get(&item.id) {
                Some(policy) => {
                    refund_for(policy, share, calendar.check_in_instant(item.check_in), now)
                }
                None => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(id: i32, room_id: i32, total: i64) -> BookingItem {
        BookingItem {
            id,
            booking_id: 1,
            room_id,
            check_in: d(2025, 6, 10),
            check_out: d(2025, 6, 12),
            adults: 2,
            children: 0,
            nightly_price: total / 2,
            extra_adult_fee: 0,
            extra_child_fee: 0,
            nights: 2,
            item_total: total,
            cancelled_at: None,
            cancel_reason: None,
        }
    }

    fn booking() -> Booking {
        let mut b = Booking::draft(Some(5), "Tran Thi B", BookingMethod::Online, Utc::now());
        b.id = 1;
        b.items = vec![item(1, 101, 2_000_000), item(2, 102, 1_000_000)];
        b.services = vec![BookingServiceLine {
            id: 1,
            booking_id: 1,
            service_id: 3,
            name: "Breakfast".into(),
            unit_price: 100_000,
            quantity: 2,
            total: 200_000,
        }];
        b.discount_amount = 500_000;
        b.recompute_totals();
        b
    }

    #[test]
    fn totals() {
        let b = booking();
        assert_eq!(b.subtotal, 3_200_000);
        assert_eq!(b.total_price, 2_700_000);
        assert_eq!(b.active_room_ids(), vec![101, 102]);
    }

    #[test]
    fn cancelling_an_item_shrinks_totals_and_clamps_discount() {
        let mut b = booking();
        b.discount_amount = 3_000_000;
        b.item_mut(1).unwrap().cancelled_at = Some(Utc::now());
        b.recompute_totals();
        assert_eq!(b.subtotal, 1_200_000);
        assert_eq!(b.discount_amount, 1_200_000);
        assert_eq!(b.total_price, 0);
        assert_eq!(b.active_room_ids(), vec![102]);
    }

    #[test]
    fn settled_incidents_add_to_total() {
        let mut b = booking();
        b.incidents.push(IncidentCharge {
            id: 1,
            booking_id: 1,
            description: "Minibar".into(),
            amount: 150_000,
            settled: false,
            created_at: Utc::now(),
        });
        b.recompute_totals();
        assert_eq!(b.total_price, 2_700_000);
        b.incidents[0].settled = true;
        b.recompute_totals();
        assert_eq!(b.total_price, 2_850_000);
    }

    #[test]
    fn illegal_transition_reports_both_ends() {
        let mut b = booking();
        let err = b.transition(StayStatus::CheckedIn, Utc::now()).unwrap_err();
        match err {
            DomainError::InvalidTransition { entity, id, from, to } => {
                assert_eq!(entity, "booking");
                assert_eq!(id, 1);
                assert_eq!(from, "pending");
                assert_eq!(to, "checked_in");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(b.stay_status, StayStatus::Pending);
    }

    #[test]
    fn cancel_records_metadata() {
        let mut b = booking();
        let now = Utc::now();
        b.cancel("changed plans", &Actor::Customer(5), now).unwrap();
        assert_eq!(b.stay_status, StayStatus::Cancelled);
        assert_eq!(b.canceled_by.as_deref(), Some("customer:5"));
        assert_eq!(b.canceled_at, Some(now));
        assert!(b.cancel("again", &Actor::System, now).is_err());
    }

    #[test]
    fn refund_is_allocated_per_item() {
        let mut b = booking();
        b.payment_status = PaymentStatus::Paid;
        b.paid_amount = 3_000_000;

        let cal = HotelCalendar::default();
        let refundable = RefundPolicy {
            refundable: true,
            refund_percent: 80,
            refund_deadline_hours: 24,
        };
        let policies = HashMap::from([
            (1, refundable.clone()),
            (2, RefundPolicy::non_refundable()),
        ]);
        let now = cal.check_in_instant(d(2025, 6, 10)) - Duration::hours(48);

        // item 1 carries 2/3 of the payment, 80% of that comes back
        assert_eq!(b.refund_due(&[1], &policies, &cal, now), 1_600_000);
        assert_eq!(b.refund_due(&[2], &policies, &cal, now), 0);
        assert_eq!(b.refund_due(&[1, 2], &policies, &cal, now), 1_600_000);

        let late = cal.check_in_instant(d(2025, 6, 10)) - Duration::hours(2);
        assert_eq!(b.refund_due(&[1, 2], &policies, &cal, late), 0);
    }

    #[test]
    fn unpaid_booking_has_nothing_to_refund() {
        let b = booking();
        let cal = HotelCalendar::default();
        let policies = HashMap::from([(1, RefundPolicy {
            refundable: true,
            refund_percent: 100,
            refund_deadline_hours: 0,
        })]);
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(b.refund_due(&[1], &policies, &cal, now), 0);
    }

    #[test]
    fn actor_round_trip() {
        for actor in [
            Actor::System,
            Actor::Staff("linh".into()),
            Actor::Customer(42),
        ] {
            assert_eq!(actor.to_string().parse::<Actor>(), Ok(actor));
        }
        assert!("robot".parse::<Actor>().is_err());
    }
}
