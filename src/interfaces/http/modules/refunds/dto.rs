//! Refund DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::OpenRefund;
use crate::domain::{BankDetails, RefundRequest};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenRefundRequest {
    pub booking_id: i32,
    /// Refund a single cancelled item instead of the whole booking
    pub booking_item_id: Option<i32>,
    /// Defaults to everything still claimable
    #[validate(range(min = 1))]
    pub amount: Option<i64>,
    #[validate(length(min = 1, max = 120))]
    pub bank_name: String,
    #[validate(length(min = 4, max = 34))]
    pub account_number: String,
    #[validate(length(min = 1, max = 120))]
    pub account_holder: String,
}

impl From<OpenRefundRequest> for OpenRefund {
    fn from(r: OpenRefundRequest) -> Self {
        OpenRefund {
            booking_id: r.booking_id,
            booking_item_id: r.booking_item_id,
            amount: r.amount,
            bank: BankDetails {
                bank_name: r.bank_name,
                account_number: r.account_number,
                account_holder: r.account_holder,
            },
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRefundsQuery {
    /// `pending`, `approved`, `rejected` or `completed`
    pub status: Option<String>,
    pub booking_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ReviewRefundRequest {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteRefundRequest {
    /// Bank transfer reference; required
    #[validate(length(max = 120))]
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundDto {
    pub id: i32,
    pub booking_id: i32,
    pub booking_item_id: Option<i32>,
    pub amount: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub status: String,
    pub receipt_ref: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RefundRequest> for RefundDto {
    fn from(r: RefundRequest) -> Self {
        Self {
            id: r.id,
            booking_id: r.booking_id,
            booking_item_id: r.booking_item_id,
            amount: r.amount,
            bank_name: r.bank.bank_name,
            account_number: r.bank.account_number,
            account_holder: r.bank.account_holder,
            status: r.status.to_string(),
            receipt_ref: r.receipt_ref,
            admin_notes: r.admin_notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
