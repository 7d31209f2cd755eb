//! Booking events
//!
//! Published on the event bus after a transition commits. The notification
//! dispatcher turns the ones guests care about into outbound notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dispatcher::NotificationKind;
use crate::domain::refund::RefundStatus;
use crate::domain::status::StayStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    BookingCreated(BookingCreatedEvent),
    PaymentConfirmed(PaymentConfirmedEvent),
    /// Check-in, check-out and no-show
    BookingStatusChanged(BookingStatusChangedEvent),
    /// Whole booking or a single item
    BookingCancelled(BookingCancelledEvent),
    RoomChanged(RoomChangedEvent),
    RefundUpdated(RefundUpdatedEvent),
}

impl Event {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BookingCreated(_) => "booking_created",
            Event::PaymentConfirmed(_) => "payment_confirmed",
            Event::BookingStatusChanged(_) => "booking_status_changed",
            Event::BookingCancelled(_) => "booking_cancelled",
            Event::RoomChanged(_) => "room_changed",
            Event::RefundUpdated(_) => "refund_updated",
        }
    }

    pub fn booking_id(&self) -> i32 {
        match self {
            Event::BookingCreated(e) => e.booking_id,
            Event::PaymentConfirmed(e) => e.booking_id,
            Event::BookingStatusChanged(e) => e.booking_id,
            Event::BookingCancelled(e) => e.booking_id,
            Event::RoomChanged(e) => e.booking_id,
            Event::RefundUpdated(e) => e.booking_id,
        }
    }

    /// Which guest notification, if any, this event produces.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            Event::BookingCreated(_) => None,
            Event::PaymentConfirmed(_) => Some(NotificationKind::Confirmation),
            Event::BookingStatusChanged(_) | Event::RoomChanged(_) => {
                Some(NotificationKind::StatusChange)
            }
            Event::BookingCancelled(_) => Some(NotificationKind::Cancellation),
            Event::RefundUpdated(_) => Some(NotificationKind::RefundUpdate),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: i32,
    pub customer_id: Option<i32>,
    pub room_ids: Vec<i32>,
    pub total_price: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub booking_id: i32,
    pub amount: i64,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusChangedEvent {
    pub booking_id: i32,
    pub from: StayStatus,
    pub to: StayStatus,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking_id: i32,
    /// Set for a partial cancellation
    pub item_id: Option<i32>,
    pub reason: String,
    pub actor: String,
    pub refundable_amount: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomChangedEvent {
    pub booking_id: i32,
    pub item_id: i32,
    pub from_room_id: i32,
    pub to_room_id: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundUpdatedEvent {
    pub refund_id: i32,
    pub booking_id: i32,
    pub status: RefundStatus,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Envelope carried on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let msg = EventMessage::new(Event::BookingStatusChanged(BookingStatusChangedEvent {
            booking_id: 12,
            from: StayStatus::Reserved,
            to: StayStatus::NoShow,
            actor: "system".into(),
            timestamp: Utc::now(),
        }));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "BookingStatusChanged");
        assert_eq!(json["data"]["to"], "no_show");
        assert_eq!(json["data"]["booking_id"], 12);
    }

    #[test]
    fn only_guest_facing_events_notify() {
        let created = Event::BookingCreated(BookingCreatedEvent {
            booking_id: 1,
            customer_id: None,
            room_ids: vec![1],
            total_price: 0,
            timestamp: Utc::now(),
        });
        assert_eq!(created.notification_kind(), None);

        let refund = Event::RefundUpdated(RefundUpdatedEvent {
            refund_id: 3,
            booking_id: 1,
            status: RefundStatus::Approved,
            amount: 10,
            timestamp: Utc::now(),
        });
        assert_eq!(refund.notification_kind(), Some(NotificationKind::RefundUpdate));
        assert_eq!(refund.booking_id(), 1);
    }
}
