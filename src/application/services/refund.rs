//! Refund workflow service
//!
//! `pending -> approved | rejected`, `approved -> completed`. One open
//! request per booking at a time; the amount asked for can never exceed what
//! cancellations made refundable minus what earlier requests already claim.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use crate::application::locks::{LockKey, LockRegistry};
use crate::domain::{
    Actor, BankDetails, DomainError, DomainResult, PaymentStatus, RefundRequest, RefundStatus,
    RepositoryProvider,
};
use crate::notifications::{Event, RefundUpdatedEvent, SharedEventBus};
use crate::shared::Clock;

#[derive(Debug, Clone)]
pub struct OpenRefund {
    pub booking_id: i32,
    /// Refund for a single cancelled item
    pub booking_item_id: Option<i32>,
    /// Defaults to everything still claimable
    pub amount: Option<i64>,
    pub bank: BankDetails,
}

pub struct RefundService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<LockRegistry>,
    events: SharedEventBus,
    clock: Arc<dyn Clock>,
}

impl RefundService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<LockRegistry>,
        events: SharedEventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            locks,
            events,
            clock,
        }
    }

    pub async fn get(&self, refund_id: i32) -> DomainResult<RefundRequest> {
        self.repos
            .refunds()
            .find_by_id(refund_id)
            .await?
            .ok_or_else(|| DomainError::not_found("refund_request", refund_id))
    }

    pub async fn list(
        &self,
        status: Option<RefundStatus>,
        booking_id: Option<i32>,
    ) -> DomainResult<Vec<RefundRequest>> {
        self.repos.refunds().list(status, booking_id).await
    }

    pub async fn open(&self, request: OpenRefund) -> DomainResult<RefundRequest> {
        let bank = &request.bank;
        if [&bank.bank_name, &bank.account_number, &bank.account_holder]
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(DomainError::Validation(
                "bank name, account number and account holder are required".into(),
            ));
        }

        let booking_id = request.booking_id;
        let _locks = self.locks.acquire([LockKey::Booking(booking_id)]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;
        let booking = uow
            .booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("booking", booking_id))?;

        if !booking.payment_status.has_funds() {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} is {}; only paid bookings can be refunded",
                booking.payment_status
            )));
        }
        if booking.refundable_amount <= 0 {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} has nothing refundable"
            )));
        }
        if let Some(open) = uow.open_refund_for(booking_id).await? {
            return Err(DomainError::Conflict(format!(
                "refund request {} for booking {booking_id} is still {}",
                open.id, open.status
            )));
        }
        if let Some(item_id) = request.booking_item_id {
            if booking.item(item_id)?.is_active() {
                return Err(DomainError::Validation(format!(
                    "item {item_id} is not cancelled"
                )));
            }
        }

        let claimable = booking.refundable_amount - uow.requested_refund_total(booking_id).await?;
        if claimable <= 0 {
            return Err(DomainError::Conflict(format!(
                "the refundable amount of booking {booking_id} is already claimed"
            )));
        }
        let amount = request.amount.unwrap_or(claimable);
        if amount <= 0 || amount > claimable {
            return Err(DomainError::Validation(format!(
                "refund amount must be between 1 and {claimable}"
            )));
        }

        let draft = RefundRequest {
            id: 0,
            booking_id,
            booking_item_id: request.booking_item_id,
            amount,
            bank: request.bank,
            status: RefundStatus::Pending,
            receipt_ref: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        let refund = uow.insert_refund(&draft).await?;
        uow.commit().await?;

        info!(
            "Refund request {} opened for booking {}: {}",
            refund.id, booking_id, amount
        );
        self.announce(&refund, now);
        Ok(refund)
    }

    pub async fn approve(
        &self,
        refund_id: i32,
        notes: Option<String>,
        actor: &Actor,
    ) -> DomainResult<RefundRequest> {
        self.advance(refund_id, actor, |r, now| r.approve(notes, now))
            .await
    }

    pub async fn reject(
        &self,
        refund_id: i32,
        notes: Option<String>,
        actor: &Actor,
    ) -> DomainResult<RefundRequest> {
        self.advance(refund_id, actor, |r, now| r.reject(notes, now))
            .await
    }

    /// Marks the transfer done. The booking's payment status follows.
    pub async fn complete(
        &self,
        refund_id: i32,
        receipt_ref: Option<String>,
        actor: &Actor,
    ) -> DomainResult<RefundRequest> {
        self.advance(refund_id, actor, |r, now| r.complete(receipt_ref, now))
            .await
    }

    async fn advance(
        &self,
        refund_id: i32,
        actor: &Actor,
        apply: impl FnOnce(&mut RefundRequest, DateTime<Utc>) -> DomainResult<()>,
    ) -> DomainResult<RefundRequest> {
        let booking_id = self.get(refund_id).await?.booking_id;
        let _locks = self.locks.acquire([LockKey::Booking(booking_id)]).await?;
        let now = self.clock.now();
        let uow = self.repos.begin().await?;

        let mut refund = uow
            .refund(refund_id)
            .await?
            .ok_or_else(|| DomainError::not_found("refund_request", refund_id))?;
        let from = refund.status;
        apply(&mut refund, now)?;
        uow.update_refund(&refund).await?;

        if refund.status == RefundStatus::Completed {
            let mut booking = uow
                .booking(booking_id)
                .await?
                .ok_or_else(|| DomainError::not_found("booking", booking_id))?;
            // Refunded only once nothing more can become refundable
            let settled = booking.stay_status.is_terminal()
                && uow.requested_refund_total(booking_id).await? >= booking.refundable_amount;
            booking.payment_status = if settled {
                PaymentStatus::Refunded
            } else {
                PaymentStatus::Partial
            };
            booking.updated_at = now;
            uow.update_booking(&booking).await?;
        }
        uow.commit().await?;

        info!(
            "Refund request {} {} -> {} by {}",
            refund.id, from, refund.status, actor
        );
        self.announce(&refund, now);
        Ok(refund)
    }

    fn announce(&self, refund: &RefundRequest, now: DateTime<Utc>) {
        metrics::counter!("stayline_refund_transitions_total", "to" => refund.status.as_str())
            .increment(1);
        self.events.publish(Event::RefundUpdated(RefundUpdatedEvent {
            refund_id: refund.id,
            booking_id: refund.booking_id,
            status: refund.status,
            amount: refund.amount,
            timestamp: now,
        }));
    }
}
