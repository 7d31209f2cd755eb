//! Booking lifecycle service
//!
//! Every state change follows the same shape: take the in-process locks for
//! the booking and its rooms, open one unit of work, re-read the booking
//! under it, apply the change, write, commit, then publish an event. Nothing
//! is published for a change that did not commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use super::availability::{ensure_room_free, refresh_room_status};
use super::pricing::{evaluate_discount, price_lines, ItemRequest, PricedItem, PricedService, ServiceRequest};
use crate::application::locks::{LockKey, LockRegistry, LockSet};
use crate::domain::booking::{BookingFilter, IncidentCharge};
use crate::domain::pricing::price_item;
use crate::domain::{
    Actor, Booking, BookingMethod, DateRange, DiscountRejection, DomainError, DomainResult,
    PaymentStatus, RefundPolicy, RepositoryProvider, RoomStatus, StayPolicy, StayStatus,
    UnitOfWork,
};
use crate::notifications::{
    BookingCancelledEvent, BookingCreatedEvent, BookingStatusChangedEvent, Event,
    PaymentConfirmedEvent, RoomChangedEvent, SharedEventBus,
};
use crate::shared::{Clock, PaginatedResult, PaginationParams};

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub customer_id: Option<i32>,
    /// Required for walk-in guests without a customer account
    pub guest_name: String,
    pub booking_method: BookingMethod,
    pub items: Vec<ItemRequest>,
    pub services: Vec<ServiceRequest>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub booking: Booking,
    /// Refund owed for this cancellation alone
    pub refund_due: i64,
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<LockRegistry>,
    events: SharedEventBus,
    clock: Arc<dyn Clock>,
    policy: StayPolicy,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<LockRegistry>,
        events: SharedEventBus,
        clock: Arc<dyn Clock>,
        policy: StayPolicy,
    ) -> Self {
        Self {
            repos,
            locks,
            events,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &StayPolicy {
        &self.policy
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get(&self, booking_id: i32) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("booking", booking_id))
    }

    pub async fn list(
        &self,
        filter: &BookingFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        self.repos.bookings().list(filter, page).await
    }

    // ── Create / pay ────────────────────────────────────────────

    /// Creates a `pending` booking after checking every room is free.
    pub async fn create(&self, request: CreateBooking) -> DomainResult<Booking> {
        let guest_name = request.guest_name.trim().to_string();
        if request.customer_id.is_none() && guest_name.is_empty() {
            return Err(DomainError::Validation(
                "walk-in bookings need a guest name".into(),
            ));
        }

        let lines = price_lines(self.repos.catalog(), &request.items, &request.services).await?;

        let now = self.clock.now();
        let today = self.policy.calendar.local_date(now);
        if let Some(first) = lines.items.iter().map(|i| i.range.check_in).min() {
            if first < today {
                return Err(DomainError::Validation(format!(
                    "check-in {first} is in the past"
                )));
            }
        }

        let _locks = self
            .locks
            .acquire(lines.items.iter().map(|i| LockKey::Room(i.room_id)))
            .await?;
        let uow = self.repos.begin().await?;
        let pending_since = self.policy.pending_since(now);

        for item in &lines.items {
            let room = uow
                .room(item.room_id)
                .await?
                .ok_or_else(|| DomainError::not_found("room", item.room_id))?;
            if !room.is_bookable() {
                return Err(DomainError::RoomUnavailable {
                    room_id: room.id,
                    check_in: item.range.check_in,
                    check_out: item.range.check_out,
                });
            }
            ensure_room_free(uow.as_ref(), item.room_id, item.range, None, None, pending_since)
                .await?;
        }

        let mut booking = Booking::draft(request.customer_id, guest_name, request.booking_method, now);
        booking.items = lines.items.iter().map(PricedItem::to_booking_item).collect();
        booking.services = lines.services.iter().map(PricedService::to_line).collect();

        if let Some(code) = request
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let found = uow.discount(code).await?;
            let uses = match (request.customer_id, found.as_ref()) {
                (Some(customer), Some(found)) => {
                    Some(uow.count_discount_uses(&found.code, customer).await?)
                }
                _ => None,
            };
            let (code, amount) = evaluate_discount(found, lines.subtotal, today, uses)?;
            booking.discount_code = Some(code.code);
            booking.discount_amount = amount;
        }
        booking.recompute_totals();

        let booking = uow.insert_booking(&booking).await?;
        for room_id in booking.active_room_ids() {
            refresh_room_status(uow.as_ref(), room_id, pending_since).await?;
        }
        uow.commit().await?;

        info!(
            "Booking {} created: {} rooms, total {}",
            booking.id,
            booking.items.len(),
            booking.total_price
        );
        metrics::counter!("stayline_bookings_created_total", "method" => booking.booking_method.as_str())
            .increment(1);
        self.events.publish(Event::BookingCreated(BookingCreatedEvent {
            booking_id: booking.id,
            customer_id: booking.customer_id,
            room_ids: booking.active_room_ids(),
            total_price: booking.total_price,
            timestamp: now,
        }));
        Ok(booking)
    }

    /// Payment gateway callback: `pending -> reserved`.
    ///
    /// Rooms are checked again because a booking paid after its unpaid
    /// window may have lost them to someone else.
    pub async fn confirm_payment(
        &self,
        booking_id: i32,
        method: &str,
        amount: i64,
    ) -> DomainResult<Booking> {
        let method = method.trim();
        if method.is_empty() {
            return Err(DomainError::Validation("payment method is required".into()));
        }
        if amount <= 0 {
            return Err(DomainError::Validation("payment amount must be positive".into()));
        }

        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        let from = booking.transition(StayStatus::Reserved, now)?;
        if amount < booking.total_price {
            return Err(DomainError::Validation(format!(
                "payment of {amount} does not cover the booking total of {}",
                booking.total_price
            )));
        }

        let pending_since = self.policy.pending_since(now);
        let stays: Vec<(i32, DateRange)> = booking
            .active_items()
            .map(|i| (i.room_id, i.range()))
            .collect();
        for (room_id, range) in stays {
            ensure_room_free(uow.as_ref(), room_id, range, Some(booking.id), None, pending_since)
                .await?;
        }

        booking.payment_status = PaymentStatus::Paid;
        booking.payment_method = Some(method.to_string());
        booking.paid_amount = amount;
        if let Some(code) = booking.discount_code.as_deref() {
            let discount = uow
                .discount(code)
                .await?
                .ok_or(DomainError::DiscountRejected(DiscountRejection::UnknownCode))?;
            let uses = match booking.customer_id {
                Some(customer_id) => Some(uow.count_discount_uses(code, customer_id).await?),
                None => None,
            };
            discount
                .check_usage(uses)
                .map_err(DomainError::DiscountRejected)?;
            uow.record_discount_usage(code, booking.customer_id, booking.id, now)
                .await?;
        }
        uow.update_booking(&booking).await?;
        uow.commit().await?;

        info!(
            "Booking {} paid via {}: {} ({} -> {})",
            booking.id, method, amount, from, booking.stay_status
        );
        record_transition(StayStatus::Reserved);
        self.events.publish(Event::PaymentConfirmed(PaymentConfirmedEvent {
            booking_id: booking.id,
            amount,
            method: method.to_string(),
            timestamp: now,
        }));
        Ok(booking)
    }

    // ── Cancellation ────────────────────────────────────────────

    /// Cancels a pending or reserved booking and records the refund owed.
    pub async fn cancel(
        &self,
        booking_id: i32,
        reason: &str,
        actor: &Actor,
    ) -> DomainResult<CancelOutcome> {
        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        let refund_due = self
            .cancel_in(uow.as_ref(), &mut booking, reason, actor, now)
            .await?;
        uow.commit().await?;

        self.announce_cancellation(&booking, None, reason, actor, now);
        Ok(CancelOutcome {
            booking,
            refund_due,
        })
    }

    /// Cancels one item. The booking follows when no active item is left.
    pub async fn cancel_item(
        &self,
        booking_id: i32,
        item_id: i32,
        reason: &str,
        actor: &Actor,
    ) -> DomainResult<CancelOutcome> {
        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if !matches!(booking.stay_status, StayStatus::Pending | StayStatus::Reserved) {
            return Err(DomainError::InvalidTransition {
                entity: "booking_item",
                id: item_id,
                from: booking.stay_status.to_string(),
                to: StayStatus::Cancelled.to_string(),
            });
        }
        let room_id = {
            let item = booking.item(item_id)?;
            if !item.is_active() {
                return Err(DomainError::Conflict(format!(
                    "item {item_id} of booking {booking_id} is already cancelled"
                )));
            }
            item.room_id
        };

        let policies = refund_policies(uow.as_ref(), &booking).await?;
        let refund_due = booking.refund_due(&[item_id], &policies, &self.policy.calendar, now);

        let item = booking.item_mut(item_id)?;
        item.cancelled_at = Some(now);
        item.cancel_reason = Some(reason.to_string());
        booking.refundable_amount += refund_due;
        booking.recompute_totals();
        booking.updated_at = now;

        let emptied = booking.active_items().next().is_none();
        if emptied {
            booking.cancel(reason, actor, now)?;
        }

        uow.update_booking(&booking).await?;
        refresh_room_status(uow.as_ref(), room_id, self.policy.pending_since(now)).await?;
        uow.commit().await?;

        if emptied {
            info!("Booking {} cancelled with its last item {}", booking.id, item_id);
        }
        self.announce_cancellation(&booking, Some(item_id), reason, actor, now);
        Ok(CancelOutcome {
            booking,
            refund_due,
        })
    }

    /// Sweep entry point: cancels a booking left unpaid past the timeout.
    pub async fn expire_unpaid(&self, booking_id: i32) -> DomainResult<Booking> {
        const REASON: &str = "unpaid timeout";

        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if booking.stay_status != StayStatus::Pending {
            return Err(DomainError::InvalidTransition {
                entity: "booking",
                id: booking_id,
                from: booking.stay_status.to_string(),
                to: StayStatus::Cancelled.to_string(),
            });
        }
        if !self.policy.unpaid_expired(&booking, now) {
            return Err(DomainError::Validation(format!(
                "booking {booking_id} is still inside its payment window"
            )));
        }

        self.cancel_in(uow.as_ref(), &mut booking, REASON, &Actor::System, now)
            .await?;
        uow.commit().await?;

        self.announce_cancellation(&booking, None, REASON, &Actor::System, now);
        Ok(booking)
    }

    /// Guest never arrived. Paid bookings move to `no_show`; unpaid ones are
    /// cancelled. Only allowed once the arrival cutoff has passed.
    pub async fn mark_no_show(&self, booking_id: i32, actor: &Actor) -> DomainResult<Booking> {
        const REASON: &str = "no-show";

        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if !matches!(booking.stay_status, StayStatus::Pending | StayStatus::Reserved) {
            return Err(DomainError::InvalidTransition {
                entity: "booking",
                id: booking_id,
                from: booking.stay_status.to_string(),
                to: StayStatus::NoShow.to_string(),
            });
        }
        if !self.policy.no_show_due(&booking, now) {
            return Err(DomainError::Validation(format!(
                "arrival cutoff for booking {booking_id} has not passed"
            )));
        }

        if booking.stay_status == StayStatus::Pending {
            self.cancel_in(uow.as_ref(), &mut booking, REASON, actor, now)
                .await?;
            uow.commit().await?;
            self.announce_cancellation(&booking, None, REASON, actor, now);
            return Ok(booking);
        }

        let from = booking.transition(StayStatus::NoShow, now)?;
        uow.update_booking(&booking).await?;
        let pending_since = self.policy.pending_since(now);
        for room_id in booking.active_room_ids() {
            refresh_room_status(uow.as_ref(), room_id, pending_since).await?;
        }
        uow.commit().await?;

        self.announce_status(&booking, from, actor, now);
        Ok(booking)
    }

    // ── Stay ────────────────────────────────────────────────────

    /// `reserved -> checked_in`, from the first arrival date on.
    pub async fn check_in(&self, booking_id: i32, actor: &Actor) -> DomainResult<Booking> {
        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if booking.stay_status == StayStatus::Reserved {
            let today = self.policy.calendar.local_date(now);
            if let Some(arrival) = booking.earliest_check_in() {
                if today < arrival {
                    return Err(DomainError::Validation(format!(
                        "booking {booking_id} cannot check in before {arrival}"
                    )));
                }
            }
        }
        let from = booking.transition(StayStatus::CheckedIn, now)?;

        uow.update_booking(&booking).await?;
        for room_id in booking.active_room_ids() {
            uow.set_room_status(room_id, RoomStatus::Occupied).await?;
        }
        uow.commit().await?;

        self.announce_status(&booking, from, actor, now);
        Ok(booking)
    }

    /// `checked_in -> checked_out`. Pending incident charges are settled
    /// into the total. Rooms that failed inspection go to cleaning.
    pub async fn check_out(
        &self,
        booking_id: i32,
        actor: &Actor,
        inspection_passed: bool,
    ) -> DomainResult<Booking> {
        self.close_stay(booking_id, actor, inspection_passed, false)
            .await
    }

    /// Sweep entry point: closes a stay left open past check-out plus grace.
    pub async fn force_check_out(&self, booking_id: i32) -> DomainResult<Booking> {
        self.close_stay(booking_id, &Actor::System, false, true)
            .await
    }

    async fn close_stay(
        &self,
        booking_id: i32,
        actor: &Actor,
        inspection_passed: bool,
        only_if_overdue: bool,
    ) -> DomainResult<Booking> {
        let locks = self.lock_booking(booking_id, &[]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if only_if_overdue
            && booking.stay_status == StayStatus::CheckedIn
            && !self.policy.checkout_overdue(&booking, now)
        {
            return Err(DomainError::Validation(format!(
                "booking {booking_id} is not past its check-out grace period"
            )));
        }
        let from = booking.transition(StayStatus::CheckedOut, now)?;

        let settled: i64 = booking
            .incidents
            .iter()
            .filter(|c| !c.settled)
            .map(|c| c.amount)
            .sum();
        for charge in booking.incidents.iter_mut() {
            charge.settled = true;
        }
        booking.recompute_totals();

        uow.update_booking(&booking).await?;
        let pending_since = self.policy.pending_since(now);
        for room_id in booking.active_room_ids() {
            if inspection_passed {
                refresh_room_status(uow.as_ref(), room_id, pending_since).await?;
            } else {
                uow.set_room_status(room_id, RoomStatus::Cleaning).await?;
            }
        }
        uow.commit().await?;

        if settled > 0 {
            info!("Booking {} settled {} in incident charges", booking.id, settled);
        }
        self.announce_status(&booking, from, actor, now);
        Ok(booking)
    }

    /// Moves one item to another room and/or dates, re-pricing it.
    pub async fn change_room(
        &self,
        booking_id: i32,
        item_id: i32,
        new_room_id: i32,
        new_range: Option<DateRange>,
        actor: &Actor,
    ) -> DomainResult<Booking> {
        let locks = self.lock_booking(booking_id, &[new_room_id]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let mut booking = load(uow.as_ref(), booking_id).await?;
        ensure_rooms_locked(&locks, &booking)?;

        if !matches!(
            booking.stay_status,
            StayStatus::Pending | StayStatus::Reserved | StayStatus::CheckedIn
        ) {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} is {}; rooms can only be changed before check-out",
                booking.stay_status
            )));
        }
        let current = booking.item(item_id)?.clone();
        if !current.is_active() {
            return Err(DomainError::Conflict(format!(
                "item {item_id} of booking {booking_id} is cancelled"
            )));
        }
        let range = new_range.unwrap_or_else(|| current.range());
        if new_room_id == current.room_id && range == current.range() {
            return Err(DomainError::Validation("nothing to change".into()));
        }

        let room = uow
            .room(new_room_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room", new_room_id))?;
        if !room.is_bookable() {
            return Err(DomainError::RoomUnavailable {
                room_id: new_room_id,
                check_in: range.check_in,
                check_out: range.check_out,
            });
        }
        let room_type = uow
            .room_type(room.room_type_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room_type", room.room_type_id))?;
        let price = price_item(&room_type, &range, current.adults, current.children)?;

        let pending_since = self.policy.pending_since(now);
        ensure_room_free(uow.as_ref(), new_room_id, range, None, Some(item_id), pending_since)
            .await?;

        let item = booking.item_mut(item_id)?;
        item.room_id = new_room_id;
        item.check_in = range.check_in;
        item.check_out = range.check_out;
        item.nightly_price = price.rate.nightly_price;
        item.extra_adult_fee = price.rate.extra_adult_fee * price.rate.extra_adults;
        item.extra_child_fee = price.rate.extra_child_fee * price.rate.extra_children;
        item.nights = i32::try_from(price.nights).unwrap_or(i32::MAX);
        item.item_total = price.item_total;
        booking.recompute_totals();
        booking.updated_at = now;

        uow.update_booking(&booking).await?;
        if current.room_id != new_room_id {
            refresh_room_status(uow.as_ref(), current.room_id, pending_since).await?;
        }
        if booking.stay_status == StayStatus::CheckedIn {
            uow.set_room_status(new_room_id, RoomStatus::Occupied).await?;
        } else {
            refresh_room_status(uow.as_ref(), new_room_id, pending_since).await?;
        }
        uow.commit().await?;

        info!(
            "Booking {} item {} moved by {}: room {} {} -> room {} {}",
            booking.id,
            item_id,
            actor,
            current.room_id,
            current.range(),
            new_room_id,
            range
        );
        self.events.publish(Event::RoomChanged(RoomChangedEvent {
            booking_id: booking.id,
            item_id,
            from_room_id: current.room_id,
            to_room_id: new_room_id,
            timestamp: now,
        }));
        Ok(booking)
    }

    /// Records a charge (damage, minibar) against a stay in progress. It is
    /// added to the total when the guest checks out.
    pub async fn add_incident_charge(
        &self,
        booking_id: i32,
        description: &str,
        amount: i64,
        actor: &Actor,
    ) -> DomainResult<IncidentCharge> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DomainError::Validation("description is required".into()));
        }
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }

        let _locks = self.locks.acquire([LockKey::Booking(booking_id)]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let booking = load(uow.as_ref(), booking_id).await?;
        if booking.stay_status != StayStatus::CheckedIn {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} is {}; incident charges need a checked-in stay",
                booking.stay_status
            )));
        }

        let charge = uow
            .insert_incident(booking_id, description, amount, now)
            .await?;
        uow.commit().await?;

        info!(
            "Incident charge {} on booking {} by {}: {} ({})",
            charge.id, booking_id, actor, amount, description
        );
        Ok(charge)
    }

    // ── Helpers ─────────────────────────────────────────────────

    /// Locks the booking and the rooms it currently holds, plus `extra_rooms`.
    async fn lock_booking(&self, booking_id: i32, extra_rooms: &[i32]) -> DomainResult<LockSet> {
        let peek = self.get(booking_id).await?;
        let keys = std::iter::once(LockKey::Booking(booking_id))
            .chain(peek.active_room_ids().into_iter().map(LockKey::Room))
            .chain(extra_rooms.iter().copied().map(LockKey::Room));
        self.locks.acquire(keys).await
    }

    /// Shared tail of every cancellation: status, refund, room release.
    /// Returns the refund owed for the items cancelled now.
    async fn cancel_in(
        &self,
        uow: &dyn UnitOfWork,
        booking: &mut Booking,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> DomainResult<i64> {
        booking.cancel(reason, actor, now)?;

        let item_ids: Vec<i32> = booking.active_items().map(|i| i.id).collect();
        let policies = refund_policies(uow, booking).await?;
        let refund_due = booking.refund_due(&item_ids, &policies, &self.policy.calendar, now);
        booking.refundable_amount += refund_due;

        uow.update_booking(booking).await?;
        let pending_since = self.policy.pending_since(now);
        for room_id in booking.active_room_ids() {
            refresh_room_status(uow, room_id, pending_since).await?;
        }
        Ok(refund_due)
    }

    fn announce_cancellation(
        &self,
        booking: &Booking,
        item_id: Option<i32>,
        reason: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) {
        match item_id {
            Some(item) => info!("Booking {} item {} cancelled by {}: {}", booking.id, item, actor, reason),
            None => info!("Booking {} cancelled by {}: {}", booking.id, actor, reason),
        }
        if booking.stay_status == StayStatus::Cancelled {
            record_transition(StayStatus::Cancelled);
        }
        self.events.publish(Event::BookingCancelled(BookingCancelledEvent {
            booking_id: booking.id,
            item_id,
            reason: reason.to_string(),
            actor: actor.to_string(),
            refundable_amount: booking.refundable_amount,
            timestamp: now,
        }));
    }

    fn announce_status(&self, booking: &Booking, from: StayStatus, actor: &Actor, now: DateTime<Utc>) {
        info!(
            "Booking {} {} -> {} by {}",
            booking.id, from, booking.stay_status, actor
        );
        record_transition(booking.stay_status);
        self.events
            .publish(Event::BookingStatusChanged(BookingStatusChangedEvent {
                booking_id: booking.id,
                from,
                to: booking.stay_status,
                actor: actor.to_string(),
                timestamp: now,
            }));
    }
}

async fn load(uow: &dyn UnitOfWork, booking_id: i32) -> DomainResult<Booking> {
    uow.booking(booking_id)
        .await?
        .ok_or_else(|| DomainError::not_found("booking", booking_id))
}

/// The room set was read before the locks were taken; a concurrent room
/// change could have moved it.
fn ensure_rooms_locked(locks: &LockSet, booking: &Booking) -> DomainResult<()> {
    let missing: Vec<i32> = booking
        .active_room_ids()
        .into_iter()
        .filter(|id| !locks.keys().contains(&LockKey::Room(*id)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    warn!("Booking {} rooms changed while waiting for locks: {:?}", booking.id, missing);
    Err(DomainError::Busy(format!(
        "booking {} changed while waiting, try again",
        booking.id
    )))
}

/// Refund policy of each item's room type, keyed by item id.
async fn refund_policies(
    uow: &dyn UnitOfWork,
    booking: &Booking,
) -> DomainResult<HashMap<i32, RefundPolicy>> {
    let mut by_room: HashMap<i32, RefundPolicy> = HashMap::new();
    let mut policies = HashMap::with_capacity(booking.items.len());
    for item in &booking.items {
        if !by_room.contains_key(&item.room_id) {
            let room = uow
                .room(item.room_id)
                .await?
                .ok_or_else(|| DomainError::not_found("room", item.room_id))?;
            let room_type = uow
                .room_type(room.room_type_id)
                .await?
                .ok_or_else(|| DomainError::not_found("room_type", room.room_type_id))?;
            by_room.insert(item.room_id, room_type.refund_policy);
        }
        if let Some(policy) = by_room.get(&item.room_id) {
            policies.insert(item.id, policy.clone());
        }
    }
    Ok(policies)
}

fn record_transition(to: StayStatus) {
    metrics::counter!("stayline_booking_transitions_total", "to" => to.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::application::services::testing::{d, Harness};
    use crate::infrastructure::database::seed::{ROOM_101, ROOM_102, ROOM_201};

    #[tokio::test]
    async fn create_prices_the_stay_and_books_the_room() {
        let h = Harness::new().await;
        let booking = h.book(ROOM_101, d(6, 1), d(6, 3)).await.unwrap();

        assert_eq!(booking.stay_status, StayStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.items.len(), 1);
        assert_eq!(booking.items[0].nights, 2);
        assert_eq!(booking.total_price, 2_000_000);
        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Booked);
    }

    #[tokio::test]
    async fn room_101_blocks_overlap_but_not_back_to_back() {
        let h = Harness::new().await;
        h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;

        let err = h.book(ROOM_101, d(6, 2), d(6, 4)).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::RoomUnavailable { room_id: ROOM_101, .. }
        ));
        assert!(h.book(ROOM_101, d(6, 3), d(6, 5)).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_creation_books_the_room_once() {
        let h = Harness::new().await;
        let mut handles = Vec::new();
        for n in 0..6 {
            let bookings = h.bookings.clone();
            handles.push(tokio::spawn(async move {
                bookings
                    .create(Harness::request(n, ROOM_201, d(6, 10), d(6, 12)))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::RoomUnavailable { .. }) | Err(DomainError::Busy(_)) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn stale_pending_booking_loses_its_room() {
        let h = Harness::new().await;
        let first = h.book(ROOM_101, d(6, 1), d(6, 3)).await.unwrap();

        h.clock.advance(Duration::hours(3));
        let second = h.book(ROOM_101, d(6, 1), d(6, 3)).await.unwrap();
        assert_ne!(first.id, second.id);

        let err = h
            .bookings
            .confirm_payment(first.id, "vnpay", first.total_price)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::RoomUnavailable { .. }));
    }

    #[tokio::test]
    async fn payment_reserves_and_counts_the_discount() {
        let h = Harness::new().await;
        let mut request = Harness::request(7, ROOM_101, d(6, 1), d(6, 3));
        request.discount_code = Some("welcome".into());
        let booking = h.bookings.create(request.clone()).await.unwrap();
        assert_eq!(booking.discount_amount, 500_000);
        assert_eq!(booking.total_price, 1_500_000);

        // not counted until paid
        request.items[0].room_id = ROOM_102;
        let unpaid_second = h.bookings.create(request.clone()).await.unwrap();
        h.bookings.cancel(unpaid_second.id, "duplicate", &Actor::Customer(7)).await.unwrap();

        let paid = h
            .bookings
            .confirm_payment(booking.id, "vnpay", 1_500_000)
            .await
            .unwrap();
        assert_eq!(paid.stay_status, StayStatus::Reserved);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.paid_amount, 1_500_000);

        let err = h.bookings.create(request).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::DiscountRejected(DiscountRejection::PerUserCap)
        ));
    }

    #[tokio::test]
    async fn second_payment_on_a_single_use_code_is_refused() {
        let h = Harness::new().await;
        let mut request = Harness::request(7, ROOM_101, d(6, 1), d(6, 3));
        request.discount_code = Some("WELCOME".into());
        let first = h.bookings.create(request.clone()).await.unwrap();
        request.items[0].room_id = ROOM_102;
        let second = h.bookings.create(request).await.unwrap();

        h.bookings
            .confirm_payment(first.id, "cash", first.total_price)
            .await
            .unwrap();
        let err = h
            .bookings
            .confirm_payment(second.id, "cash", second.total_price)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::DiscountRejected(DiscountRejection::PerUserCap)
        ));

        let second = h.bookings.get(second.id).await.unwrap();
        assert_eq!(second.stay_status, StayStatus::Pending);
        assert_eq!(second.payment_status, PaymentStatus::Pending);
        let usages = h.repos.discounts().list_usages("WELCOME").await.unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].booking_id, first.id);
    }

    #[tokio::test]
    async fn underpayment_and_double_payment_are_refused() {
        let h = Harness::new().await;
        let booking = h.book(ROOM_101, d(6, 1), d(6, 3)).await.unwrap();

        let short = h.bookings.confirm_payment(booking.id, "cash", 1).await;
        assert!(matches!(short, Err(DomainError::Validation(_))));

        h.bookings
            .confirm_payment(booking.id, "cash", booking.total_price)
            .await
            .unwrap();
        let again = h
            .bookings
            .confirm_payment(booking.id, "cash", booking.total_price)
            .await;
        assert!(matches!(again, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn refund_depends_on_the_deadline() {
        let h = Harness::new().await;
        let early = h.book_paid(ROOM_101, d(6, 10), d(6, 12)).await;
        let late = h.book_paid(ROOM_102, d(6, 10), d(6, 12)).await;
        let check_in_at = h.bookings.policy().calendar.check_in_instant(d(6, 10));

        h.clock.set(check_in_at - Duration::hours(48));
        let outcome = h.bookings.cancel(early.id, "plans changed", &Actor::Customer(1)).await.unwrap();
        assert_eq!(outcome.refund_due, 1_600_000);
        assert_eq!(outcome.booking.refundable_amount, 1_600_000);
        assert_eq!(outcome.booking.canceled_by.as_deref(), Some("customer:1"));

        h.clock.set(check_in_at - Duration::hours(2));
        let outcome = h.bookings.cancel(late.id, "plans changed", &Actor::Customer(1)).await.unwrap();
        assert_eq!(outcome.refund_due, 0);

        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Available);
        assert!(h
            .bookings
            .cancel(late.id, "again", &Actor::System)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn cancelling_the_last_item_cancels_the_booking() {
        let h = Harness::new().await;
        let mut request = Harness::request(3, ROOM_101, d(6, 10), d(6, 12));
        request.items.push(ItemRequest {
            room_id: ROOM_102,
            ..request.items[0].clone()
        });
        let booking = h.bookings.create(request).await.unwrap();
        assert_eq!(booking.total_price, 4_000_000);
        h.bookings.confirm_payment(booking.id, "vnpay", 4_000_000).await.unwrap();

        let first = booking.items[0].id;
        let second = booking.items[1].id;
        let outcome = h
            .bookings
            .cancel_item(booking.id, first, "one room is enough", &Actor::Customer(3))
            .await
            .unwrap();
        // half the payment sits on the item, 80% of it comes back
        assert_eq!(outcome.refund_due, 1_600_000);
        assert_eq!(outcome.booking.stay_status, StayStatus::Reserved);
        assert_eq!(outcome.booking.total_price, 2_000_000);
        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Available);

        let again = h
            .bookings
            .cancel_item(booking.id, first, "twice", &Actor::Customer(3))
            .await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));

        let outcome = h
            .bookings
            .cancel_item(booking.id, second, "trip off", &Actor::Customer(3))
            .await
            .unwrap();
        assert_eq!(outcome.booking.stay_status, StayStatus::Cancelled);
        assert_eq!(outcome.booking.refundable_amount, 3_200_000);
    }

    #[tokio::test]
    async fn check_in_waits_for_the_arrival_date() {
        let h = Harness::new().await;
        let booking = h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;
        let staff = Actor::Staff("linh".into());

        let early = h.bookings.check_in(booking.id, &staff).await;
        assert!(matches!(early, Err(DomainError::Validation(_))));

        h.clock.set(h.bookings.policy().calendar.check_in_instant(d(6, 1)));
        let stay = h.bookings.check_in(booking.id, &staff).await.unwrap();
        assert_eq!(stay.stay_status, StayStatus::CheckedIn);
        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Occupied);
    }

    #[tokio::test]
    async fn pending_booking_cannot_check_in() {
        let h = Harness::new().await;
        let booking = h.book(ROOM_101, d(5, 20), d(5, 22)).await.unwrap();
        let err = h
            .bookings
            .check_in(booking.id, &Actor::Staff("linh".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn check_out_settles_incidents() {
        let h = Harness::new().await;
        let booking = h.book_paid(ROOM_101, d(5, 20), d(5, 22)).await;
        let staff = Actor::Staff("linh".into());
        h.bookings.check_in(booking.id, &staff).await.unwrap();

        h.bookings
            .add_incident_charge(booking.id, "Minibar", 120_000, &staff)
            .await
            .unwrap();
        let done = h.bookings.check_out(booking.id, &staff, false).await.unwrap();

        assert_eq!(done.stay_status, StayStatus::CheckedOut);
        assert_eq!(done.total_price, 2_120_000);
        assert!(done.incidents.iter().all(|c| c.settled));
        assert_eq!(done.outstanding(), 120_000);
        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Cleaning);

        let late = h
            .bookings
            .add_incident_charge(booking.id, "Towel", 50_000, &staff)
            .await;
        assert!(matches!(late, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn change_room_reprices_and_moves_the_hold() {
        let h = Harness::new().await;
        let booking = h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;
        let blocker = h.book_paid(ROOM_102, d(6, 2), d(6, 4)).await;
        let item_id = booking.items[0].id;
        let staff = Actor::Staff("linh".into());

        let taken = h
            .bookings
            .change_room(booking.id, item_id, ROOM_102, None, &staff)
            .await;
        assert!(matches!(taken, Err(DomainError::RoomUnavailable { .. })));

        let moved = h
            .bookings
            .change_room(booking.id, item_id, ROOM_201, None, &staff)
            .await
            .unwrap();
        assert_eq!(moved.items[0].room_id, ROOM_201);
        assert_eq!(moved.items[0].item_total, 5_000_000);
        assert_eq!(moved.total_price, 5_000_000);
        assert_eq!(h.room_status(ROOM_101).await, RoomStatus::Available);
        assert_eq!(h.room_status(ROOM_201).await, RoomStatus::Booked);

        // its own dates never block it
        let stretched = h
            .bookings
            .change_room(
                booking.id,
                item_id,
                ROOM_201,
                Some(DateRange::new(d(6, 1), d(6, 4)).unwrap()),
                &staff,
            )
            .await
            .unwrap();
        assert_eq!(stretched.items[0].nights, 3);
        assert!(blocker.id != booking.id);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_date() {
        let h = Harness::new().await;
        let june = h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;
        h.book(ROOM_102, d(7, 1), d(7, 3)).await.unwrap();

        let reserved = h
            .bookings
            .list(
                &BookingFilter {
                    stay_status: Some(StayStatus::Reserved),
                    ..Default::default()
                },
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(reserved.total, 1);
        assert_eq!(reserved.items[0].id, june.id);

        let on_june_second = h
            .bookings
            .list(
                &BookingFilter {
                    date: Some(d(6, 2)),
                    ..Default::default()
                },
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(on_june_second.total, 1);

        let checkout_day = h
            .bookings
            .list(
                &BookingFilter {
                    date: Some(d(6, 3)),
                    ..Default::default()
                },
                PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(checkout_day.total, 0);
    }

    #[tokio::test]
    async fn cancellation_is_published_after_commit() {
        let mut h = Harness::new().await;
        let booking = h.book(ROOM_101, d(6, 1), d(6, 3)).await.unwrap();
        h.bookings
            .cancel(booking.id, "changed plans", &Actor::Customer(1))
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Some(message) = h.events.try_recv() {
            kinds.push(message.event.event_type());
        }
        assert_eq!(kinds, vec!["booking_created", "booking_cancelled"]);
    }
}
