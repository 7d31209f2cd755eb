//! Refund request entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainResult;
use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Pending and approved requests block a new request for the same booking.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub fn can_transition_to(&self, to: RefundStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Completed)
        )
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RefundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown refund status '{other}'")),
        }
    }
}

/// Where the money goes back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: i32,
    pub booking_id: i32,
    /// Set when the refund covers a single cancelled item
    pub booking_item_id: Option<i32>,
    pub amount: i64,
    pub bank: BankDetails,
    pub status: RefundStatus,
    pub receipt_ref: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundRequest {
    pub fn approve(&mut self, notes: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.move_to(RefundStatus::Approved, now)?;
        if notes.is_some() {
            self.admin_notes = notes;
        }
        Ok(())
    }

    pub fn reject(&mut self, notes: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.move_to(RefundStatus::Rejected, now)?;
        if notes.is_some() {
            self.admin_notes = notes;
        }
        Ok(())
    }

    /// Completing requires proof the transfer happened.
    pub fn complete(&mut self, receipt_ref: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        let receipt = receipt_ref
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(DomainError::MissingReceipt { refund_id: self.id })?;
        self.move_to(RefundStatus::Completed, now)?;
        self.receipt_ref = Some(receipt);
        Ok(())
    }

    fn move_to(&mut self, to: RefundStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                entity: "refund_request",
                id: self.id,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RefundRequest {
        let now = Utc::now();
        RefundRequest {
            id: 7,
            booking_id: 1,
            booking_item_id: None,
            amount: 1_600_000,
            bank: BankDetails {
                bank_name: "VCB".into(),
                account_number: "0011".into(),
                account_holder: "NGUYEN VAN A".into(),
            },
            status: RefundStatus::Pending,
            receipt_ref: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn happy_path() {
        let mut r = request();
        r.approve(Some("ok".into()), Utc::now()).unwrap();
        r.complete(Some("TRX-1".into()), Utc::now()).unwrap();
        assert_eq!(r.status, RefundStatus::Completed);
        assert_eq!(r.receipt_ref.as_deref(), Some("TRX-1"));
        assert_eq!(r.admin_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn completion_requires_receipt() {
        let mut r = request();
        r.approve(None, Utc::now()).unwrap();
        assert!(matches!(
            r.complete(None, Utc::now()),
            Err(DomainError::MissingReceipt { refund_id: 7 })
        ));
        assert!(matches!(
            r.complete(Some("   ".into()), Utc::now()),
            Err(DomainError::MissingReceipt { .. })
        ));
        assert_eq!(r.status, RefundStatus::Approved);
    }

    #[test]
    fn cannot_complete_unapproved_or_reopen_rejected() {
        let mut r = request();
        assert!(matches!(
            r.complete(Some("TRX".into()), Utc::now()),
            Err(DomainError::InvalidTransition { .. })
        ));
        r.reject(None, Utc::now()).unwrap();
        assert!(!r.status.is_open());
        assert!(r.approve(None, Utc::now()).is_err());
    }
}
