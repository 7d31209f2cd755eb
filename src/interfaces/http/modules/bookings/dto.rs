//! Booking DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{CreateBooking, ItemRequest, ServiceRequest};
use crate::domain::booking::{BookingServiceLine, IncidentCharge};
use crate::domain::{Booking, BookingItem, BookingMethod, StatusCodeTable, StayStatus};

// ── Requests ───────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct StayItemRequest {
    pub room_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, max = 20))]
    pub adults: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 20))]
    pub children: i32,
}

impl From<&StayItemRequest> for ItemRequest {
    fn from(r: &StayItemRequest) -> Self {
        ItemRequest {
            room_id: r.room_id,
            check_in: r.check_in,
            check_out: r.check_out,
            adults: r.adults,
            children: r.children,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ServiceLineRequest {
    pub service_id: i32,
    #[validate(range(min = 1, max = 100))]
    pub quantity: i32,
}

impl From<&ServiceLineRequest> for ServiceRequest {
    fn from(r: &ServiceLineRequest) -> Self {
        ServiceRequest {
            service_id: r.service_id,
            quantity: r.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    /// Registered customer; omit for a walk-in and give `guest_name`
    pub customer_id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub guest_name: String,
    /// `online` (default) or `offline`
    #[serde(default = "default_booking_method")]
    #[schema(value_type = String, example = "online")]
    pub booking_method: BookingMethod,
    #[validate(length(min = 1, max = 10), nested)]
    pub items: Vec<StayItemRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<ServiceLineRequest>,
    #[validate(length(min = 1, max = 50))]
    pub discount_code: Option<String>,
}

fn default_booking_method() -> BookingMethod {
    BookingMethod::Online
}

impl From<CreateBookingRequest> for CreateBooking {
    fn from(r: CreateBookingRequest) -> Self {
        CreateBooking {
            customer_id: r.customer_id,
            guest_name: r.guest_name,
            booking_method: r.booking_method,
            items: r.items.iter().map(ItemRequest::from).collect(),
            services: r.services.iter().map(ServiceRequest::from).collect(),
            discount_code: r.discount_code,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBookingsQuery {
    /// Status name (`reserved`) or its numeric code
    pub status: Option<String>,
    /// Bookings with a stay covering this date
    pub date: Option<NaiveDate>,
    pub customer_id: Option<i32>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoomRequest {
    pub new_room_id: i32,
    /// New dates; give both or neither
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckOutRequest {
    /// `false` sends the rooms to cleaning
    #[serde(default = "yes")]
    pub inspection_passed: bool,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IncidentRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

// ── Responses ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingItemDto {
    pub id: i32,
    pub room_id: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i32,
    pub children: i32,
    pub nights: i32,
    pub nightly_price: i64,
    pub extra_adult_fee: i64,
    pub extra_child_fee: i64,
    pub item_total: i64,
    pub active: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl From<&BookingItem> for BookingItemDto {
    fn from(i: &BookingItem) -> Self {
        Self {
            id: i.id,
            room_id: i.room_id,
            check_in: i.check_in,
            check_out: i.check_out,
            adults: i.adults,
            children: i.children,
            nights: i.nights,
            nightly_price: i.nightly_price,
            extra_adult_fee: i.extra_adult_fee,
            extra_child_fee: i.extra_child_fee,
            item_total: i.item_total,
            active: i.is_active(),
            cancelled_at: i.cancelled_at,
            cancel_reason: i.cancel_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceLineDto {
    pub service_id: i32,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub total: i64,
}

impl From<&BookingServiceLine> for ServiceLineDto {
    fn from(s: &BookingServiceLine) -> Self {
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
pub struct IncidentDto {
    pub id: i32,
    pub description: String,
    pub amount: i64,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&IncidentCharge> for IncidentDto {
    fn from(c: &IncidentCharge) -> Self {
        Self {
            id: c.id,
            description: c.description.clone(),
            amount: c.amount,
            settled: c.settled,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDto {
    pub id: i32,
    pub customer_id: Option<i32>,
    pub guest_name: String,
    pub stay_status: String,
    /// Numeric code of `stay_status` for legacy consumers
    pub status_code: i32,
    pub status_label: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub booking_method: String,
    pub subtotal: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total_price: i64,
    pub paid_amount: i64,
    pub refundable_amount: i64,
    pub cancel_reason: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<BookingItemDto>,
    pub services: Vec<ServiceLineDto>,
    pub incidents: Vec<IncidentDto>,
}

impl BookingDto {
    pub fn new(b: &Booking, codes: &StatusCodeTable) -> Self {
        Self {
            id: b.id,
            customer_id: b.customer_id,
            guest_name: b.guest_name.clone(),
            stay_status: b.stay_status.to_string(),
            status_code: codes.code(b.stay_status),
            status_label: b.stay_status.label().to_string(),
            payment_status: b.payment_status.to_string(),
            payment_method: b.payment_method.clone(),
            booking_method: b.booking_method.as_str().to_string(),
            subtotal: b.subtotal,
            discount_code: b.discount_code.clone(),
            discount_amount: b.discount_amount,
            total_price: b.total_price,
            paid_amount: b.paid_amount,
            refundable_amount: b.refundable_amount,
            cancel_reason: b.cancel_reason.clone(),
            canceled_at: b.canceled_at,
            canceled_by: b.canceled_by.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
            items: b.items.iter().map(BookingItemDto::from).collect(),
            services: b.services.iter().map(ServiceLineDto::from).collect(),
            incidents: b.incidents.iter().map(IncidentDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingPage {
    pub items: Vec<BookingDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub booking: BookingDto,
    /// Amount owed back to the guest under the room refund policies
    pub refund_due: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StayStatusDto {
    pub status: String,
    pub code: i32,
    pub label: String,
    pub badge_color: String,
    pub terminal: bool,
    /// Whether a booking in this status keeps its rooms
    pub holds_room: bool,
    pub next: Vec<String>,
}

impl StayStatusDto {
    pub fn new(status: StayStatus, codes: &StatusCodeTable) -> Self {
        Self {
            status: status.to_string(),
            code: codes.code(status),
            label: status.label().to_string(),
            badge_color: status.badge_color().to_string(),
            terminal: status.is_terminal(),
            holds_room: status.holds_room(),
            next: status
                .allowed_targets()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
