//! Row <-> domain conversions shared by the repositories and the unit of work

use std::collections::HashMap;
use std::str::FromStr;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::domain::booking::{Booking, BookingItem, BookingServiceLine, IncidentCharge};
use crate::domain::discount::{DiscountCode, DiscountUsage};
use crate::domain::refund::{BankDetails, RefundRequest};
use crate::domain::room::{HotelService, RefundPolicy, Room, RoomType};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{
    booking, booking_item, booking_service, discount_code, discount_usage, hotel_service,
    incident_charge, refund_request, room, room_type,
};

/// Lock contention surfaces as `Busy` so callers can retry; anything else
/// is a storage failure.
pub(crate) fn db_err(e: DbErr) -> DomainError {
    let msg = e.to_string();
    let lowered = msg.to_lowercase();
    if lowered.contains("database is locked")
        || lowered.contains("database table is locked")
        || lowered.contains("could not obtain lock")
    {
        DomainError::Busy(msg)
    } else {
        DomainError::Storage(msg)
    }
}

fn parse<T: FromStr<Err = String>>(raw: &str) -> DomainResult<T> {
    raw.parse::<T>()
        .map_err(|e| DomainError::Storage(format!("corrupt row: {e}")))
}

fn id_value(id: i32) -> sea_orm::ActiveValue<i32> {
    if id > 0 {
        Set(id)
    } else {
        NotSet
    }
}

// ── Catalog ─────────────────────────────────────────────────────

pub(super) fn room_type_to_domain(m: room_type::Model) -> RoomType {
    RoomType {
        id: m.id,
        name: m.name,
        base_price: m.base_price,
        base_adults: m.base_adults,
        base_children: m.base_children,
        max_adults: m.max_adults,
        max_children: m.max_children,
        extra_adult_fee: m.extra_adult_fee,
        extra_child_fee: m.extra_child_fee,
        refund_policy: RefundPolicy {
            refundable: m.refundable,
            refund_percent: m.refund_percent,
            refund_deadline_hours: m.refund_deadline_hours,
        },
    }
}

pub(super) fn room_to_domain(m: room::Model) -> DomainResult<Room> {
    Ok(Room {
        id: m.id,
        room_number: m.room_number,
        room_type_id: m.room_type_id,
        status: parse(&m.status)?,
    })
}

pub(super) fn service_to_domain(m: hotel_service::Model) -> HotelService {
    HotelService {
        id: m.id,
        name: m.name,
        price: m.price,
        is_active: m.is_active,
    }
}

// ── Bookings ────────────────────────────────────────────────────

fn item_to_domain(m: booking_item::Model) -> BookingItem {
    BookingItem {
        id: m.id,
        booking_id: m.booking_id,
        room_id: m.room_id,
        check_in: m.check_in,
        check_out: m.check_out,
        adults: m.adults,
        children: m.children,
        nightly_price: m.nightly_price,
        extra_adult_fee: m.extra_adult_fee,
        extra_child_fee: m.extra_child_fee,
        nights: m.nights,
        item_total: m.item_total,
        cancelled_at: m.cancelled_at,
        cancel_reason: m.cancel_reason,
    }
}

fn service_line_to_domain(m: booking_service::Model) -> BookingServiceLine {
    BookingServiceLine {
        id: m.id,
        booking_id: m.booking_id,
        service_id: m.service_id,
        name: m.name,
        unit_price: m.unit_price,
        quantity: m.quantity,
        total: m.total,
    }
}

pub(super) fn incident_to_domain(m: incident_charge::Model) -> IncidentCharge {
    IncidentCharge {
        id: m.id,
        booking_id: m.booking_id,
        description: m.description,
        amount: m.amount,
        settled: m.settled,
        created_at: m.created_at,
    }
}

fn booking_to_domain(
    m: booking::Model,
    items: Vec<booking_item::Model>,
    services: Vec<booking_service::Model>,
    incidents: Vec<incident_charge::Model>,
) -> DomainResult<Booking> {
    Ok(Booking {
        id: m.id,
        customer_id: m.customer_id,
        guest_name: m.guest_name,
        stay_status: parse(&m.stay_status)?,
        payment_status: parse(&m.payment_status)?,
        payment_method: m.payment_method,
        booking_method: parse(&m.booking_method)?,
        subtotal: m.subtotal,
        discount_code: m.discount_code,
        discount_amount: m.discount_amount,
        total_price: m.total_price,
        paid_amount: m.paid_amount,
        refundable_amount: m.refundable_amount,
        cancel_reason: m.cancel_reason,
        canceled_at: m.canceled_at,
        canceled_by: m.canceled_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
        items: items.into_iter().map(item_to_domain).collect(),
        services: services.into_iter().map(service_line_to_domain).collect(),
        incidents: incidents.into_iter().map(incident_to_domain).collect(),
    })
}

fn group_by_booking<T>(rows: Vec<T>, key: impl Fn(&T) -> i32) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

/// Attaches items, services and incidents to booking rows, preserving the
/// order of `models`.
pub(super) async fn load_bookings<C: ConnectionTrait>(
    conn: &C,
    models: Vec<booking::Model>,
) -> DomainResult<Vec<Booking>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = models.iter().map(|m| m.id).collect();

    let items = booking_item::Entity::find()
        .filter(booking_item::Column::BookingId.is_in(ids.clone()))
        .order_by_asc(booking_item::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;
    let services = booking_service::Entity::find()
        .filter(booking_service::Column::BookingId.is_in(ids.clone()))
        .order_by_asc(booking_service::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;
    let incidents = incident_charge::Entity::find()
        .filter(incident_charge::Column::BookingId.is_in(ids))
        .order_by_asc(incident_charge::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;

    let mut items = group_by_booking(items, |i| i.booking_id);
    let mut services = group_by_booking(services, |s| s.booking_id);
    let mut incidents = group_by_booking(incidents, |c| c.booking_id);

    models
        .into_iter()
        .map(|m| {
            let id = m.id;
            booking_to_domain(
                m,
                items.remove(&id).unwrap_or_default(),
                services.remove(&id).unwrap_or_default(),
                incidents.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

pub(super) fn booking_active(b: &Booking) -> booking::ActiveModel {
    booking::ActiveModel {
        id: id_value(b.id),
        customer_id: Set(b.customer_id),
        guest_name: Set(b.guest_name.clone()),
        stay_status: Set(b.stay_status.as_str().to_string()),
        payment_status: Set(b.payment_status.as_str().to_string()),
        payment_method: Set(b.payment_method.clone()),
        booking_method: Set(b.booking_method.as_str().to_string()),
        subtotal: Set(b.subtotal),
        discount_code: Set(b.discount_code.clone()),
        discount_amount: Set(b.discount_amount),
        total_price: Set(b.total_price),
        paid_amount: Set(b.paid_amount),
        refundable_amount: Set(b.refundable_amount),
        cancel_reason: Set(b.cancel_reason.clone()),
        canceled_at: Set(b.canceled_at),
        canceled_by: Set(b.canceled_by.clone()),
        created_at: Set(b.created_at),
        updated_at: Set(b.updated_at),
    }
}

pub(super) fn item_active(i: &BookingItem, booking_id: i32) -> booking_item::ActiveModel {
    booking_item::ActiveModel {
        id: id_value(i.id),
        booking_id: Set(booking_id),
        room_id: Set(i.room_id),
        check_in: Set(i.check_in),
        check_out: Set(i.check_out),
        adults: Set(i.adults),
        children: Set(i.children),
        nightly_price: Set(i.nightly_price),
        extra_adult_fee: Set(i.extra_adult_fee),
        extra_child_fee: Set(i.extra_child_fee),
        nights: Set(i.nights),
        item_total: Set(i.item_total),
        cancelled_at: Set(i.cancelled_at),
        cancel_reason: Set(i.cancel_reason.clone()),
    }
}

pub(super) fn service_line_active(
    s: &BookingServiceLine,
    booking_id: i32,
) -> booking_service::ActiveModel {
    booking_service::ActiveModel {
        id: id_value(s.id),
        booking_id: Set(booking_id),
        service_id: Set(s.service_id),
        name: Set(s.name.clone()),
        unit_price: Set(s.unit_price),
        quantity: Set(s.quantity),
        total: Set(s.total),
    }
}

// ── Discounts ───────────────────────────────────────────────────

pub(super) fn discount_to_domain(m: discount_code::Model) -> DomainResult<DiscountCode> {
    Ok(DiscountCode {
        id: m.id,
        code: m.code,
        discount_type: parse(&m.discount_type)?,
        value: m.value,
        min_total: m.min_total,
        max_uses: m.max_uses,
        max_uses_per_user: m.max_uses_per_user,
        max_discount_amount: m.max_discount_amount,
        start_date: m.start_date,
        end_date: m.end_date,
        is_active: m.status == "active",
        used_count: m.used_count,
    })
}

pub(super) fn usage_to_domain(m: discount_usage::Model) -> DiscountUsage {
    DiscountUsage {
        id: m.id,
        code: m.code,
        customer_id: m.customer_id,
        booking_id: m.booking_id,
        used_at: m.used_at,
    }
}

// ── Refunds ─────────────────────────────────────────────────────

pub(super) fn refund_to_domain(m: refund_request::Model) -> DomainResult<RefundRequest> {
    Ok(RefundRequest {
        id: m.id,
        booking_id: m.booking_id,
        booking_item_id: m.booking_item_id,
        amount: m.amount,
        bank: BankDetails {
            bank_name: m.bank_name,
            account_number: m.account_number,
            account_holder: m.account_holder,
        },
        status: parse(&m.status)?,
        receipt_ref: m.receipt_ref,
        admin_notes: m.admin_notes,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub(super) fn refund_active(r: &RefundRequest) -> refund_request::ActiveModel {
    refund_request::ActiveModel {
        id: id_value(r.id),
        booking_id: Set(r.booking_id),
        booking_item_id: Set(r.booking_item_id),
        amount: Set(r.amount),
        bank_name: Set(r.bank.bank_name.clone()),
        account_number: Set(r.bank.account_number.clone()),
        account_holder: Set(r.bank.account_holder.clone()),
        status: Set(r.status.as_str().to_string()),
        receipt_ref: Set(r.receipt_ref.clone()),
        admin_notes: Set(r.admin_notes.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_errors_map_to_busy() {
        let err = db_err(DbErr::Custom("database is locked".into()));
        assert!(matches!(err, DomainError::Busy(_)));

        let err = db_err(DbErr::Custom("no such table: rooms".into()));
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
