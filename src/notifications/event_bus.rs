//! In-process bus for committed booking events
//!
//! Services publish only after their transaction commits. A slow subscriber
//! that falls more than the channel capacity behind skips the oldest events
//! and the skip is counted in `stayline_events_lagged_total`.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::broadcast;

use super::events::{Event, EventMessage};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Never blocks. Without subscribers the event is dropped.
    pub fn publish(&self, event: Event) {
        let message = EventMessage::new(event);
        let kind = message.event.event_type();
        let booking_id = message.event.booking_id();

        let delivered = self.sender.send(message).unwrap_or(0);
        debug!("Booking {} {} published to {} subscribers", booking_id, kind, delivered);
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
}

impl EventSubscriber {
    /// Next event, or None once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, {} booking events skipped", skipped);
                    metrics::counter!("stayline_events_lagged_total").increment(skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}
