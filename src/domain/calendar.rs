//! Stay dates and hotel-local deadlines
//!
//! Stays are booked as whole dates. The hour a guest may arrive or must
//! leave is a hotel policy applied in the hotel's own time zone, so every
//! deadline is resolved through `HotelCalendar`.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

/// Half-open range of nights `[check_in, check_out)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_in >= check_out {
            return Err(DomainError::Validation(format!(
                "check_out ({check_out}) must be after check_in ({check_in})"
            )));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// `[a1,a2)` and `[b1,b2)` overlap iff `a1 < b2 && b1 < a2`.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Whether a guest staying this range sleeps at the hotel on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

#[derive(Debug, Clone)]
pub struct HotelCalendar {
    pub timezone: Tz,
    pub check_in_time: NaiveTime,
    pub check_out_time: NaiveTime,
    pub no_show_cutoff: NaiveTime,
}

impl Default for HotelCalendar {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
            check_in_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
            check_out_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
            no_show_cutoff: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
        }
    }
}

impl HotelCalendar {
    /// The hotel-local calendar date at `now`.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn check_in_instant(&self, date: NaiveDate) -> DateTime<Utc> {
        self.instant(date, self.check_in_time)
    }

    pub fn check_out_instant(&self, date: NaiveDate) -> DateTime<Utc> {
        self.instant(date, self.check_out_time)
    }

    pub fn no_show_deadline(&self, check_in: NaiveDate) -> DateTime<Utc> {
        self.instant(check_in, self.no_show_cutoff)
    }

    /// Resolves a local wall-clock time to UTC. Ambiguous times (DST fall
    /// back) take the earlier instant; times skipped by a DST jump resolve
    /// one hour later.
    fn instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                let shifted = naive + Duration::hours(1);
                self.timezone
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(a: NaiveDate, b: NaiveDate) -> DateRange {
        DateRange::new(a, b).unwrap()
    }

    #[test]
    fn empty_or_inverted_range_is_rejected() {
        assert!(DateRange::new(d(2025, 6, 3), d(2025, 6, 3)).is_err());
        assert!(DateRange::new(d(2025, 6, 3), d(2025, 6, 1)).is_err());
    }

    #[test]
    fn overlap_is_half_open() {
        let held = range(d(2025, 6, 1), d(2025, 6, 3));
        assert!(held.overlaps(&range(d(2025, 6, 2), d(2025, 6, 4))));
        assert!(!held.overlaps(&range(d(2025, 6, 3), d(2025, 6, 5))));
        assert!(!held.overlaps(&range(d(2025, 5, 30), d(2025, 6, 1))));
        assert!(held.overlaps(&range(d(2025, 5, 30), d(2025, 6, 10))));
        assert_eq!(held.nights(), 2);
    }

    #[test]
    fn covers_excludes_checkout_day() {
        let stay = range(d(2025, 6, 1), d(2025, 6, 3));
        assert!(stay.covers(d(2025, 6, 1)));
        assert!(stay.covers(d(2025, 6, 2)));
        assert!(!stay.covers(d(2025, 6, 3)));
    }

    #[test]
    fn deadlines_resolve_in_hotel_time() {
        let cal = HotelCalendar::default();
        // UTC+7, no DST
        assert_eq!(
            cal.check_in_instant(d(2025, 6, 1)),
            Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()
        );
        assert_eq!(
            cal.no_show_deadline(d(2025, 6, 1)),
            Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap()
        );
        assert_eq!(
            cal.local_date(Utc.with_ymd_and_hms(2025, 5, 31, 18, 0, 0).unwrap()),
            d(2025, 6, 1)
        );
    }

    #[test]
    fn dst_gap_shifts_forward() {
        let cal = HotelCalendar {
            timezone: chrono_tz::Europe::Berlin,
            check_in_time: NaiveTime::from_hms_opt(2, 30, 0).unwrap(),
            ..HotelCalendar::default()
        };
        // 02:30 does not exist on 2025-03-30 in Berlin; 03:30 CEST is 01:30 UTC
        assert_eq!(
            cal.check_in_instant(d(2025, 3, 30)),
            Utc.with_ymd_and_hms(2025, 3, 30, 1, 30, 0).unwrap()
        );
    }
}
