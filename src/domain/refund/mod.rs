//! Refund requests

pub mod model;
pub mod repository;

pub use model::{BankDetails, RefundRequest, RefundStatus};
pub use repository::RefundRepository;
