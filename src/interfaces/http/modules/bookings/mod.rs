//! Bookings: create, read, cancel, move, check in and out

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
