//! Discount codes

pub mod model;
pub mod repository;

pub use model::{DiscountCode, DiscountRejection, DiscountType, DiscountUsage};
pub use repository::DiscountRepository;
