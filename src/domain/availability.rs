//! Room occupancy rules
//!
//! A `RoomHold` is one non-cancelled booking item on a room. Whether it
//! blocks a requested range depends on the parent booking's status and, for
//! unpaid bookings, on how long ago the booking was made.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::calendar::DateRange;
use super::room::RoomStatus;
use super::status::StayStatus;

#[derive(Debug, Clone, Serialize)]
pub struct RoomHold {
    pub booking_id: i32,
    pub item_id: i32,
    pub room_id: i32,
    pub range: DateRange,
    pub stay_status: StayStatus,
    pub booking_created_at: DateTime<Utc>,
}

impl RoomHold {
    /// Reserved and checked-in stays always hold the room; pending ones only
    /// while they are younger than the unpaid timeout.
    pub fn is_active(&self, pending_since: DateTime<Utc>) -> bool {
        match self.stay_status {
            StayStatus::Reserved | StayStatus::CheckedIn => true,
            StayStatus::Pending => self.booking_created_at > pending_since,
            _ => false,
        }
    }
}

/// Holds that prevent `range` from being booked. `exclude_item` is skipped so
/// an item can be moved within its own dates.
pub fn blocking_holds<'a>(
    holds: &'a [RoomHold],
    range: &'a DateRange,
    exclude_item: Option<i32>,
    pending_since: DateTime<Utc>,
) -> impl Iterator<Item = &'a RoomHold> + 'a {
    holds.iter().filter(move |h| {
        Some(h.item_id) != exclude_item && h.range.overlaps(range) && h.is_active(pending_since)
    })
}

/// Coarse status a room should show given the holds left on it. A guest in
/// the room wins over an upcoming stay.
pub fn derived_room_status(holds: &[RoomHold], pending_since: DateTime<Utc>) -> RoomStatus {
    let active: Vec<&RoomHold> = holds.iter().filter(|h| h.is_active(pending_since)).collect();
    if active.iter().any(|h| h.stay_status == StayStatus::CheckedIn) {
        RoomStatus::Occupied
    } else if active.is_empty() {
        RoomStatus::Available
    } else {
        RoomStatus::Booked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn hold(item_id: i32, status: StayStatus, created_at: DateTime<Utc>) -> RoomHold {
        RoomHold {
            booking_id: item_id,
            item_id,
            room_id: 101,
            range: DateRange::new(d(6, 1), d(6, 3)).unwrap(),
            stay_status: status,
            booking_created_at: created_at,
        }
    }

    #[test]
    fn room_101_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap();
        let holds = vec![hold(1, StayStatus::Reserved, now - Duration::days(3))];
        let since = now - Duration::hours(2);

        let overlapping = DateRange::new(d(6, 2), d(6, 4)).unwrap();
        assert_eq!(blocking_holds(&holds, &overlapping, None, since).count(), 1);

        let back_to_back = DateRange::new(d(6, 3), d(6, 5)).unwrap();
        assert_eq!(blocking_holds(&holds, &back_to_back, None, since).count(), 0);
    }

    #[test]
    fn stale_pending_does_not_block() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let since = now - Duration::hours(2);
        let range = DateRange::new(d(6, 1), d(6, 2)).unwrap();

        let fresh = vec![hold(1, StayStatus::Pending, now - Duration::minutes(30))];
        assert_eq!(blocking_holds(&fresh, &range, None, since).count(), 1);

        let stale = vec![hold(1, StayStatus::Pending, now - Duration::hours(3))];
        assert_eq!(blocking_holds(&stale, &range, None, since).count(), 0);
    }

    #[test]
    fn excluded_item_and_terminal_bookings_are_ignored() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let since = now - Duration::hours(2);
        let range = DateRange::new(d(6, 1), d(6, 2)).unwrap();

        let holds = vec![
            hold(1, StayStatus::CheckedIn, now),
            hold(2, StayStatus::Cancelled, now),
            hold(3, StayStatus::NoShow, now),
        ];
        assert_eq!(blocking_holds(&holds, &range, Some(1), since).count(), 0);
        assert_eq!(blocking_holds(&holds, &range, None, since).count(), 1);
    }

    #[test]
    fn derived_status_prefers_occupied() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let since = now - Duration::hours(2);

        assert_eq!(derived_room_status(&[], since), RoomStatus::Available);
        assert_eq!(
            derived_room_status(&[hold(1, StayStatus::Reserved, now)], since),
            RoomStatus::Booked
        );
        assert_eq!(
            derived_room_status(
                &[
                    hold(1, StayStatus::Reserved, now),
                    hold(2, StayStatus::CheckedIn, now)
                ],
                since
            ),
            RoomStatus::Occupied
        );
        let stale = hold(3, StayStatus::Pending, now - Duration::hours(5));
        assert_eq!(derived_room_status(&[stale], since), RoomStatus::Available);
    }
}
