//! Pricing DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::services::{AppliedDiscount, PricedItem, PricedService, Quote};
use crate::application::{ItemRequest, QuoteRequest, ServiceRequest};
use crate::interfaces::http::modules::bookings::{ServiceLineRequest, StayItemRequest};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuoteRequestBody {
    /// Needed to check per-customer discount caps
    pub customer_id: Option<i32>,
    #[validate(length(min = 1, max = 10), nested)]
    pub items: Vec<StayItemRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<ServiceLineRequest>,
    #[validate(length(min = 1, max = 50))]
    pub discount_code: Option<String>,
}

impl From<QuoteRequestBody> for QuoteRequest {
    fn from(r: QuoteRequestBody) -> Self {
        QuoteRequest {
            customer_id: r.customer_id,
            items: r.items.iter().map(ItemRequest::from).collect(),
            services: r.services.iter().map(ServiceRequest::from).collect(),
            discount_code: r.discount_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotedItemDto {
    pub room_id: i32,
    pub room_number: String,
    pub room_type_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub nights: i64,
    pub base_price: i64,
    /// Extra adult surcharge per night, already multiplied by the count
    pub extra_adult_fee: i64,
    pub extra_child_fee: i64,
    pub nightly_price: i64,
    pub item_total: i64,
}

impl From<&PricedItem> for QuotedItemDto {
    fn from(i: &PricedItem) -> Self {
        let rate = &i.price.rate;
        Self {
            room_id: i.room_id,
            room_number: i.room_number.clone(),
            room_type_name: i.room_type_name.clone(),
            check_in: i.range.check_in,
            check_out: i.range.check_out,
            adults: i.adults,
            children: i.children,
            nights: i.price.nights,
            base_price: rate.base_price,
            extra_adult_fee: rate.extra_adult_fee * rate.extra_adults,
            extra_child_fee: rate.extra_child_fee * rate.extra_children,
            nightly_price: rate.nightly_price,
            item_total: i.price.item_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotedServiceDto {
    pub service_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub total: i64,
}

impl From<&PricedService> for QuotedServiceDto {
    fn from(s: &PricedService) -> Self {
        Self {
            service_id: s.service_id,
            name: s.name.clone(),
            unit_price: s.unit_price,
            quantity: s.quantity,
            total: s.total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteDto {
    pub items: Vec<QuotedItemDto>,
    pub services: Vec<QuotedServiceDto>,
    pub subtotal: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total: i64,
}

impl From<Quote> for QuoteDto {
    fn from(q: Quote) -> Self {
        Self {
            items: q.lines.items.iter().map(QuotedItemDto::from).collect(),
            services: q.lines.services.iter().map(QuotedServiceDto::from).collect(),
            subtotal: q.lines.subtotal,
            discount_code: q.discount_code,
            discount_amount: q.discount_amount,
            total: q.total,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyDiscountRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(range(min = 0))]
    pub subtotal: i64,
    pub customer_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedDiscountDto {
    pub code: String,
    /// `percent` or `fixed`
    pub discount_type: String,
    pub discount_amount: i64,
    pub total_after: i64,
}

impl From<AppliedDiscount> for AppliedDiscountDto {
    fn from(a: AppliedDiscount) -> Self {
        Self {
            code: a.code,
            discount_type: a.discount_type.as_str().to_string(),
            discount_amount: a.discount_amount,
            total_after: a.total_after,
        }
    }
}
