//! Availability service
//!
//! Answers "is this room free" for callers outside a write path, and holds
//! the helpers write paths use inside their own transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::availability::{blocking_holds, derived_room_status};
use crate::domain::pricing::{price_item, ItemPrice};
use crate::domain::{
    DateRange, DomainError, DomainResult, RepositoryProvider, RoomStatus, StayPolicy, UnitOfWork,
};
use crate::shared::Clock;

/// Fails with `RoomUnavailable` if an active stay other than `own_booking`
/// or `exclude_item` overlaps `range` on `room_id`.
pub(crate) async fn ensure_room_free(
    uow: &dyn UnitOfWork,
    room_id: i32,
    range: DateRange,
    own_booking: Option<i32>,
    exclude_item: Option<i32>,
    pending_since: DateTime<Utc>,
) -> DomainResult<()> {
    let mut holds = uow.room_holds(room_id, Some(range)).await?;
    if let Some(own) = own_booking {
        holds.retain(|h| h.booking_id != own);
    }
    if let Some(hold) = blocking_holds(&holds, &range, exclude_item, pending_since).next() {
        debug!(
            room_id,
            requested = %range,
            held_by = hold.booking_id,
            held = %hold.range,
            "Room unavailable"
        );
        return Err(DomainError::RoomUnavailable {
            room_id,
            check_in: range.check_in,
            check_out: range.check_out,
        });
    }
    Ok(())
}

/// Re-derives the coarse status of `room_id` from the stays left on it.
/// Rooms under maintenance are left untouched.
pub(crate) async fn refresh_room_status(
    uow: &dyn UnitOfWork,
    room_id: i32,
    pending_since: DateTime<Utc>,
) -> DomainResult<RoomStatus> {
    let Some(room) = uow.room(room_id).await? else {
        return Err(DomainError::not_found("room", room_id));
    };
    if room.status == RoomStatus::Maintenance {
        return Ok(room.status);
    }
    let holds = uow.room_holds(room_id, None).await?;
    let status = derived_room_status(&holds, pending_since);
    if status != room.status {
        uow.set_room_status(room_id, status).await?;
    }
    Ok(status)
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableRoom {
    pub room_id: i32,
    pub room_number: String,
    pub room_type_id: i32,
    pub room_type_name: String,
    pub price: ItemPrice,
}

pub struct AvailabilityService {
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    policy: StayPolicy,
}

impl AvailabilityService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: Arc<dyn Clock>, policy: StayPolicy) -> Self {
        Self {
            repos,
            clock,
            policy,
        }
    }

    /// Whether `room_id` can take a stay over `range`. Read only.
    pub async fn is_room_free(
        &self,
        room_id: i32,
        range: DateRange,
        exclude_item: Option<i32>,
    ) -> DomainResult<bool> {
        let pending_since = self.policy.pending_since(self.clock.now());
        let uow = self.repos.begin().await?;
        if uow.room(room_id).await?.is_none() {
            return Err(DomainError::not_found("room", room_id));
        }
        match ensure_room_free(uow.as_ref(), room_id, range, None, exclude_item, pending_since).await {
            Ok(()) => Ok(true),
            Err(DomainError::RoomUnavailable { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Rooms not under maintenance whose type fits the party and which are
    /// free for `range`, cheapest first.
    pub async fn search(
        &self,
        range: DateRange,
        adults: i32,
        children: i32,
    ) -> DomainResult<Vec<AvailableRoom>> {
        let rooms = self.repos.catalog().list_rooms().await?;
        let room_types = self.repos.catalog().list_room_types().await?;

        let mut candidates = Vec::new();
        for room in rooms.into_iter().filter(|r| r.is_bookable()) {
            let Some(room_type) = room_types.iter().find(|t| t.id == room.room_type_id) else {
                continue;
            };
            if !room_type.accepts(adults, children) {
                continue;
            }
            let price = price_item(room_type, &range, adults, children)?;
            candidates.push(AvailableRoom {
                room_id: room.id,
                room_number: room.room_number,
                room_type_id: room_type.id,
                room_type_name: room_type.name.clone(),
                price,
            });
        }

        let pending_since = self.policy.pending_since(self.clock.now());
        let uow = self.repos.begin().await?;
        let mut free = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match ensure_room_free(uow.as_ref(), candidate.room_id, range, None, None, pending_since).await {
                Ok(()) => free.push(candidate),
                Err(DomainError::RoomUnavailable { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        drop(uow);

        free.sort_by(|a, b| {
            a.price
                .item_total
                .cmp(&b.price.item_total)
                .then_with(|| a.room_number.cmp(&b.room_number))
        });
        debug!(%range, adults, children, found = free.len(), "Availability search");
        Ok(free)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::application::services::testing::{d, Harness};
    use crate::infrastructure::database::seed::{ROOM_101, ROOM_102, ROOM_201, ROOM_202};

    fn range(a: (u32, u32), b: (u32, u32)) -> DateRange {
        DateRange::new(d(a.0, a.1), d(b.0, b.1)).unwrap()
    }

    #[tokio::test]
    async fn room_101_is_free_back_to_back() {
        let h = Harness::new().await;
        let held = h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;
        let svc = h.availability();

        assert!(!svc.is_room_free(ROOM_101, range((6, 2), (6, 4)), None).await.unwrap());
        assert!(svc.is_room_free(ROOM_101, range((6, 3), (6, 5)), None).await.unwrap());
        assert!(svc
            .is_room_free(ROOM_101, range((6, 2), (6, 4)), Some(held.items[0].id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn pending_hold_lapses_after_the_unpaid_timeout() {
        let h = Harness::new().await;
        h.book(ROOM_102, d(6, 1), d(6, 3)).await.unwrap();
        let svc = h.availability();
        let stay = range((6, 1), (6, 3));

        assert!(!svc.is_room_free(ROOM_102, stay, None).await.unwrap());
        h.clock.advance(Duration::hours(2) + Duration::seconds(1));
        assert!(svc.is_room_free(ROOM_102, stay, None).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let h = Harness::new().await;
        let err = h
            .availability()
            .is_room_free(999, range((6, 1), (6, 2)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn search_skips_taken_and_undersized_rooms() {
        let h = Harness::new().await;
        h.book_paid(ROOM_101, d(6, 1), d(6, 3)).await;
        let svc = h.availability();

        let rooms = svc.search(range((6, 2), (6, 4)), 2, 0).await.unwrap();
        let ids: Vec<i32> = rooms.iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![ROOM_102, ROOM_201, ROOM_202]);
        assert_eq!(rooms[0].price.item_total, 2_000_000);

        // four adults only fit in a suite
        let rooms = svc.search(range((6, 2), (6, 4)), 4, 0).await.unwrap();
        assert!(rooms.iter().all(|r| r.room_id == ROOM_201 || r.room_id == ROOM_202));
        assert_eq!(rooms.len(), 2);
    }
}
