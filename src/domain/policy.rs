//! Stay deadlines
//!
//! The three wall-clock rules the sweep enforces. Services evaluate the same
//! predicates again under lock before acting, so a booking that changed
//! between the sweep's read and its write is left alone.

use chrono::{DateTime, Duration, Utc};

use super::booking::Booking;
use super::calendar::HotelCalendar;
use super::status::StayStatus;

#[derive(Debug, Clone)]
pub struct StayPolicy {
    pub calendar: HotelCalendar,
    /// How long a pending booking holds its rooms without payment
    pub unpaid_timeout: Duration,
    /// Time after the check-out instant before a stay is closed automatically
    pub checkout_grace: Duration,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self {
            calendar: HotelCalendar::default(),
            unpaid_timeout: Duration::hours(2),
            checkout_grace: Duration::hours(4),
        }
    }
}

impl StayPolicy {
    /// Pending bookings created after this instant still hold their rooms.
    pub fn pending_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.unpaid_timeout
    }

    pub fn unpaid_expired(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        booking.stay_status == StayStatus::Pending && now - booking.created_at > self.unpaid_timeout
    }

    /// Any active item whose arrival cutoff has passed.
    pub fn no_show_due(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        matches!(booking.stay_status, StayStatus::Pending | StayStatus::Reserved)
            && booking
                .active_items()
                .any(|i| now > self.calendar.no_show_deadline(i.check_in))
    }

    pub fn checkout_overdue(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        booking.stay_status == StayStatus::CheckedIn
            && booking
                .active_items()
                .any(|i| now > self.calendar.check_out_instant(i.check_out) + self.checkout_grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::{BookingItem, BookingMethod};
    use chrono::{NaiveDate, TimeZone};

    fn booking(status: StayStatus, created_at: DateTime<Utc>) -> Booking {
        let mut b = Booking::draft(None, "Walk-in", BookingMethod::Offline, created_at);
        b.stay_status = status;
        b.items.push(BookingItem {
            id: 1,
            booking_id: 1,
            room_id: 1,
            check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            adults: 2,
            children: 0,
            nightly_price: 1,
            extra_adult_fee: 0,
            extra_child_fee: 0,
            nights: 2,
            item_total: 2,
            cancelled_at: None,
            cancel_reason: None,
        });
        b
    }

    #[test]
    fn unpaid_timeout_is_strict() {
        let policy = StayPolicy::default();
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let b = booking(StayStatus::Pending, created);
        assert!(!policy.unpaid_expired(&b, created + Duration::hours(2)));
        assert!(policy.unpaid_expired(&b, created + Duration::hours(2) + Duration::seconds(1)));
        let paid = booking(StayStatus::Reserved, created);
        assert!(!policy.unpaid_expired(&paid, created + Duration::days(1)));
    }

    #[test]
    fn no_show_after_nine_pm_local() {
        let policy = StayPolicy::default();
        let b = booking(StayStatus::Reserved, Utc::now());
        // 21:00 in Ho Chi Minh City is 14:00 UTC
        assert!(!policy.no_show_due(&b, Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap()));
        assert!(policy.no_show_due(&b, Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 1).unwrap()));
    }

    #[test]
    fn cancelled_items_do_not_count() {
        let policy = StayPolicy::default();
        let mut b = booking(StayStatus::Reserved, Utc::now());
        b.items[0].cancelled_at = Some(Utc::now());
        assert!(!policy.no_show_due(&b, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn forced_checkout_after_grace() {
        let policy = StayPolicy::default();
        let b = booking(StayStatus::CheckedIn, Utc::now());
        // check-out 14:00 local on 06-03 is 07:00 UTC, plus 4h grace
        let deadline = Utc.with_ymd_and_hms(2025, 6, 3, 11, 0, 0).unwrap();
        assert!(!policy.checkout_overdue(&b, deadline));
        assert!(policy.checkout_overdue(&b, deadline + Duration::minutes(1)));
    }
}
