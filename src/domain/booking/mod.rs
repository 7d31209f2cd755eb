//! Booking aggregate
//!
//! Contains the Booking entity, its lines, and the read repository interface.

pub mod model;
pub mod repository;

pub use model::{
    Actor, Booking, BookingItem, BookingMethod, BookingServiceLine, IncidentCharge, PaymentStatus,
};
pub use repository::{BookingFilter, BookingRepository};
