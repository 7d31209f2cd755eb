//! Sweep observability

pub mod handlers;

pub use handlers::*;
