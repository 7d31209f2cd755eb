//! Notification dispatcher
//!
//! Subscribes to the event bus and forwards guest-facing events to the
//! external notification service. Delivery happens after the transition has
//! committed, is retried with exponential backoff up to a fixed number of
//! attempts, and a final failure is only logged and counted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::event_bus::EventBus;
use super::events::EventMessage;
use crate::shared::retry::{retry_with_backoff, RetryConfig};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Confirmation,
    StatusChange,
    Cancellation,
    RefundUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::StatusChange => "status_change",
            Self::Cancellation => "cancellation",
            Self::RefundUpdate => "refund_update",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Same id as the originating event, usable as an idempotency key
    pub id: Uuid,
    pub booking_id: i32,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn from_event(message: &EventMessage) -> Option<Self> {
        let kind = message.event.notification_kind()?;
        Some(Self {
            id: message.id,
            booking_id: message.event.booking_id(),
            kind,
            created_at: message.timestamp,
            payload: serde_json::to_value(&message.event).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    /// Worth retrying (timeout, 5xx, connection reset)
    #[error("delivery failed: {0}")]
    Unavailable(String),

    /// The service refused the message; retrying will not help
    #[error("rejected: {0}")]
    Rejected(String),
}

impl NotificationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotificationError::Unavailable(_))
    }
}

/// Outbound channel to guests (email, SMS, push).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log. Used when no delivery service is wired.
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            notification_id = %notification.id,
            booking_id = notification.booking_id,
            kind = notification.kind.as_str(),
            "📨 Notification"
        );
        Ok(())
    }
}

/// How long shutdown waits for deliveries already in flight.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
    retry: RetryConfig,
    drain_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, retry: RetryConfig) -> Self {
        Self {
            sender,
            retry,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Start the dispatcher background task.
    ///
    /// The bus subscription is taken before this returns, so events
    /// published afterwards are never missed. On shutdown, deliveries in
    /// flight get the drain timeout to finish; whatever is left is aborted
    /// and logged.
    pub fn start(self, bus: &EventBus, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let mut subscriber = bus.subscribe();
        let dispatcher = Arc::new(self);

        tokio::spawn(async move {
            info!(
                max_attempts = dispatcher.retry.max_attempts,
                "📨 Notification dispatcher started"
            );
            let mut in_flight: JoinSet<bool> = JoinSet::new();

            loop {
                tokio::select! {
                    message = subscriber.recv() => {
                        let Some(message) = message else { break };
                        let Some(notification) = Notification::from_event(&message) else {
                            continue;
                        };
                        let dispatcher = dispatcher.clone();
                        in_flight.spawn(async move { dispatcher.deliver(notification).await });
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                    _ = shutdown.notified().wait() => {
                        info!("📨 Notification dispatcher shutting down");
                        break;
                    }
                }
            }

            dispatcher.drain(&mut in_flight).await;
            info!("📨 Notification dispatcher stopped");
        })
    }

    async fn drain(&self, in_flight: &mut JoinSet<bool>) {
        if in_flight.is_empty() {
            return;
        }
        info!(
            pending = in_flight.len(),
            "📨 Waiting for notifications in flight"
        );
        let finished = tokio::time::timeout(self.drain_timeout, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;
        if finished.is_err() {
            let abandoned = in_flight.len();
            in_flight.abort_all();
            warn!(abandoned, "📨 Notifications abandoned at shutdown");
            metrics::counter!("stayline_notifications_abandoned_total").increment(abandoned as u64);
        }
    }

    /// Delivers one notification, retrying transient failures.
    pub async fn deliver(&self, notification: Notification) -> bool {
        let kind = notification.kind.as_str();
        let result = retry_with_backoff(
            &self.retry,
            || self.sender.send(&notification),
            NotificationError::is_retryable,
            "send_notification",
        )
        .await;

        match result {
            Ok(()) => {
                debug!(booking_id = notification.booking_id, kind, "Notification delivered");
                metrics::counter!("stayline_notifications_total", "kind" => kind, "outcome" => "delivered")
                    .increment(1);
                true
            }
            Err(e) => {
                error!(
                    notification_id = %notification.id,
                    booking_id = notification.booking_id,
                    kind,
                    error = %e,
                    "Notification dropped"
                );
                metrics::counter!("stayline_notifications_total", "kind" => kind, "outcome" => "failed")
                    .increment(1);
                false
            }
        }
    }
}
