//! SeaORM implementation of UnitOfWork
//!
//! Wraps one `DatabaseTransaction`. sea-orm rolls the transaction back when
//! it is dropped uncommitted, which covers every early return in the
//! services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::convert::{
    booking_active, db_err, discount_to_domain, incident_to_domain, item_active, load_bookings,
    refund_active, refund_to_domain, room_to_domain, room_type_to_domain, service_line_active,
    service_to_domain,
};
use crate::domain::availability::RoomHold;
use crate::domain::booking::{Booking, IncidentCharge};
use crate::domain::calendar::DateRange;
use crate::domain::discount::DiscountCode;
use crate::domain::refund::{RefundRequest, RefundStatus};
use crate::domain::room::{HotelService, Room, RoomStatus, RoomType};
use crate::domain::status::StayStatus;
use crate::domain::{DomainError, DomainResult, UnitOfWork};
use crate::infrastructure::database::entities::{
    booking, booking_item, discount_code, discount_usage, hotel_service, incident_charge,
    refund_request, room, room_type,
};

const HOLDING_STATUSES: [StayStatus; 3] = [
    StayStatus::Pending,
    StayStatus::Reserved,
    StayStatus::CheckedIn,
];

pub struct SeaOrmUnitOfWork {
    txn: DatabaseTransaction,
}

impl SeaOrmUnitOfWork {
    pub async fn begin<C: TransactionTrait>(db: &C) -> DomainResult<Self> {
        let txn = db.begin().await.map_err(db_err)?;
        Ok(Self { txn })
    }
}

fn holding_statuses() -> Vec<&'static str> {
    HOLDING_STATUSES.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    // ── Catalog ─────────────────────────────────────────────────

    async fn room(&self, id: i32) -> DomainResult<Option<Room>> {
        room::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(room_to_domain)
            .transpose()
    }

    async fn room_type(&self, id: i32) -> DomainResult<Option<RoomType>> {
        let model = room_type::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(room_type_to_domain))
    }

    async fn service(&self, id: i32) -> DomainResult<Option<HotelService>> {
        let model = hotel_service::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(service_to_domain))
    }

    async fn set_room_status(&self, room_id: i32, status: RoomStatus) -> DomainResult<()> {
        debug!("Room {} -> {}", room_id, status);
        room::Entity::update_many()
            .col_expr(room::Column::Status, Expr::value(status.as_str()))
            .filter(room::Column::Id.eq(room_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ── Availability ────────────────────────────────────────────

    async fn room_holds(&self, room_id: i32, range: Option<DateRange>) -> DomainResult<Vec<RoomHold>> {
        let mut query = booking_item::Entity::find()
            .find_also_related(booking::Entity)
            .filter(booking_item::Column::RoomId.eq(room_id))
            .filter(booking_item::Column::CancelledAt.is_null())
            .filter(booking::Column::StayStatus.is_in(holding_statuses()));

        if let Some(range) = range {
            query = query
                .filter(booking_item::Column::CheckIn.lt(range.check_out))
                .filter(booking_item::Column::CheckOut.gt(range.check_in));
        }

        let rows = query
            .order_by_asc(booking_item::Column::CheckIn)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .filter_map(|(item, parent)| parent.map(|b| (item, b)))
            .map(|(item, parent)| {
                let stay_status = parent
                    .stay_status
                    .parse::<StayStatus>()
                    .map_err(DomainError::Storage)?;
                Ok(RoomHold {
                    booking_id: parent.id,
                    item_id: item.id,
                    room_id: item.room_id,
                    range: DateRange {
                        check_in: item.check_in,
                        check_out: item.check_out,
                    },
                    stay_status,
                    booking_created_at: parent.created_at,
                })
            })
            .collect()
    }

    // ── Bookings ────────────────────────────────────────────────

    async fn booking(&self, id: i32) -> DomainResult<Option<Booking>> {
        let Some(model) = booking::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Ok(load_bookings(&self.txn, vec![model]).await?.pop())
    }

    async fn insert_booking(&self, b: &Booking) -> DomainResult<Booking> {
        let header = booking_active(b).insert(&self.txn).await.map_err(db_err)?;
        let booking_id = header.id;
        debug!("Inserted booking {} with {} items", booking_id, b.items.len());

        for item in &b.items {
            item_active(item, booking_id)
                .insert(&self.txn)
                .await
                .map_err(db_err)?;
        }
        for line in &b.services {
            service_line_active(line, booking_id)
                .insert(&self.txn)
                .await
                .map_err(db_err)?;
        }

        load_bookings(&self.txn, vec![header])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Storage(format!("booking {booking_id} vanished after insert")))
    }

    async fn update_booking(&self, b: &Booking) -> DomainResult<()> {
        booking_active(b).update(&self.txn).await.map_err(db_err)?;

        for item in &b.items {
            item_active(item, b.id)
                .update(&self.txn)
                .await
                .map_err(db_err)?;
        }
        for charge in &b.incidents {
            incident_charge::ActiveModel {
                id: Set(charge.id),
                settled: Set(charge.settled),
                ..Default::default()
            }
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn insert_incident(
        &self,
        booking_id: i32,
        description: &str,
        amount: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<IncidentCharge> {
        let model = incident_charge::ActiveModel {
            id: NotSet,
            booking_id: Set(booking_id),
            description: Set(description.to_string()),
            amount: Set(amount),
            settled: Set(false),
            created_at: Set(at),
        }
        .insert(&self.txn)
        .await
        .map_err(db_err)?;
        Ok(incident_to_domain(model))
    }

    async fn non_terminal_bookings(&self) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::StayStatus.is_in(holding_statuses()))
            .order_by_asc(booking::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        load_bookings(&self.txn, models).await
    }

    // ── Discounts ───────────────────────────────────────────────

    async fn discount(&self, code: &str) -> DomainResult<Option<DiscountCode>> {
        discount_code::Entity::find()
            .filter(discount_code::Column::Code.eq(code.trim().to_uppercase()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(discount_to_domain)
            .transpose()
    }

    async fn count_discount_uses(&self, code: &str, customer_id: i32) -> DomainResult<u64> {
        discount_usage::Entity::find()
            .filter(discount_usage::Column::Code.eq(code.trim().to_uppercase()))
            .filter(discount_usage::Column::CustomerId.eq(customer_id))
            .count(&self.txn)
            .await
            .map_err(db_err)
    }

    async fn record_discount_usage(
        &self,
        code: &str,
        customer_id: Option<i32>,
        booking_id: i32,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let code = code.trim().to_uppercase();
        discount_usage::ActiveModel {
            id: NotSet,
            code: Set(code.clone()),
            customer_id: Set(customer_id),
            booking_id: Set(booking_id),
            used_at: Set(at),
        }
        .insert(&self.txn)
        .await
        .map_err(db_err)?;

        discount_code::Entity::update_many()
            .col_expr(
                discount_code::Column::UsedCount,
                Expr::col(discount_code::Column::UsedCount).add(1),
            )
            .filter(discount_code::Column::Code.eq(code))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ── Refunds ─────────────────────────────────────────────────

    async fn refund(&self, id: i32) -> DomainResult<Option<RefundRequest>> {
        refund_request::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(refund_to_domain)
            .transpose()
    }

    async fn open_refund_for(&self, booking_id: i32) -> DomainResult<Option<RefundRequest>> {
        refund_request::Entity::find()
            .filter(refund_request::Column::BookingId.eq(booking_id))
            .filter(refund_request::Column::Status.is_in([
                RefundStatus::Pending.as_str(),
                RefundStatus::Approved.as_str(),
            ]))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(refund_to_domain)
            .transpose()
    }

    async fn requested_refund_total(&self, booking_id: i32) -> DomainResult<i64> {
        let models = refund_request::Entity::find()
            .filter(refund_request::Column::BookingId.eq(booking_id))
            .filter(refund_request::Column::Status.ne(RefundStatus::Rejected.as_str()))
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(models.iter().map(|m| m.amount).sum())
    }

    async fn insert_refund(&self, r: &RefundRequest) -> DomainResult<RefundRequest> {
        let model = refund_active(r).insert(&self.txn).await.map_err(db_err)?;
        refund_to_domain(model)
    }

    async fn update_refund(&self, r: &RefundRequest) -> DomainResult<()> {
        refund_active(r).update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.txn.commit().await.map_err(db_err)
    }
}
