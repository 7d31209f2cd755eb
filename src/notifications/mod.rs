//! Notifications module
//!
//! Booking events are published on an in-process bus once a transition has
//! committed. The dispatcher subscribes to the bus and delivers guest-facing
//! events through a `NotificationSender` with bounded retries.
//!
//! # Usage
//! ```ignore
//! let event_bus = create_event_bus();
//! NotificationDispatcher::new(Arc::new(LogNotificationSender), RetryConfig::default())
//!     .start(&event_bus, shutdown.clone());
//! ```

pub mod dispatcher;
pub mod event_bus;
pub mod events;

pub use dispatcher::{
    LogNotificationSender, Notification, NotificationDispatcher, NotificationError,
    NotificationKind, NotificationSender,
};
pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::*;
