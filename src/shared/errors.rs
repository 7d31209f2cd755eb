use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::discount::DiscountRejection;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: i32,
        from: String,
        to: String,
    },

    #[error("Room {room_id} is not available from {check_in} to {check_out}")]
    RoomUnavailable {
        room_id: i32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Discount rejected: {0}")]
    DiscountRejected(DiscountRejection),

    #[error("Refund request {refund_id} cannot complete without a receipt reference")]
    MissingReceipt { refund_id: i32 },

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        DomainError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    /// Whether the operation may succeed if retried later
    /// (lock wait exceeded, store temporarily locked).
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Busy(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics recorder error: {0}")]
    Metrics(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}
