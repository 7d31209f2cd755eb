pub mod availability;
pub mod bookings;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod pricing;
pub mod refunds;
pub mod scheduler;
