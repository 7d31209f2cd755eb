//! Payment gateway callback

pub mod handlers;

pub use handlers::*;
