//! # Stayline
//!
//! Hotel booking lifecycle and room availability engine.
//!
//! A booking moves through `pending -> reserved -> checked_in -> checked_out`
//! (or `cancelled`, `expired`, `no_show`). Every write holds per-room locks
//! and runs in one database transaction, so two bookings can never hold the
//! same room on overlapping nights.
//!
//! ## Architecture
//!
//! - **domain**: Stay status machine, hotel calendar, pricing, discount and
//!   refund rules, repository traits
//! - **application**: Booking, availability, pricing and refund services,
//!   the room lock registry and the stay scheduler
//! - **infrastructure**: SeaORM entities, migrations and repositories
//! - **interfaces**: REST API with Swagger documentation
//! - **notifications**: Post-commit event bus and guest notification dispatch
//! - **server**: Runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod notifications;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::create_api_router;

// Re-export notifications
pub use notifications::{create_event_bus, Event, EventBus, SharedEventBus};
