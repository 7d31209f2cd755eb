//! Discount code entity and evaluation rules

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pricing::percent_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the booking total
    Percent,
    /// `value` is an amount in the smallest currency unit
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(Self::Percent),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown discount type '{other}'")),
        }
    }
}

/// Why a code could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRejection {
    UnknownCode,
    Inactive,
    NotYetValid,
    Expired,
    BelowMinimum,
    Exhausted,
    PerUserCap,
}

impl DiscountRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownCode => "unknown_code",
            Self::Inactive => "inactive",
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::BelowMinimum => "below_minimum",
            Self::Exhausted => "exhausted",
            Self::PerUserCap => "per_user_cap",
        }
    }
}

impl fmt::Display for DiscountRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: i32,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    /// Booking total must be at least this much
    pub min_total: i64,
    /// None = unlimited
    pub max_uses: Option<i32>,
    /// None = unlimited
    pub max_uses_per_user: Option<i32>,
    /// Cap for percent discounts
    pub max_discount_amount: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub used_count: i32,
}

impl DiscountCode {
    /// Amount taken off `total`, or why the code does not apply.
    ///
    /// `today` is the hotel-local date; the validity window is inclusive on
    /// both ends. `uses_by_customer` is `None` for walk-in guests, who are
    /// not subject to the per-user cap.
    pub fn evaluate(
        &self,
        total: i64,
        today: NaiveDate,
        uses_by_customer: Option<u64>,
    ) -> Result<i64, DiscountRejection> {
        if !self.is_active {
            return Err(DiscountRejection::Inactive);
        }
        if today < self.start_date {
            return Err(DiscountRejection::NotYetValid);
        }
        if today > self.end_date {
            return Err(DiscountRejection::Expired);
        }
        if total < self.min_total {
            return Err(DiscountRejection::BelowMinimum);
        }
        self.check_usage(uses_by_customer)?;

        Ok(self.amount_for(total))
    }

    /// Global and per-customer use caps alone. Payment runs this again
    /// against the locked row, since quotes and bookings do not consume a use.
    pub fn check_usage(&self, uses_by_customer: Option<u64>) -> Result<(), DiscountRejection> {
        if let Some(max) = self.max_uses {
            if self.used_count >= max {
                return Err(DiscountRejection::Exhausted);
            }
        }
        if let (Some(cap), Some(used)) = (self.max_uses_per_user, uses_by_customer) {
            if used >= u64::try_from(cap.max(0)).unwrap_or_default() {
                return Err(DiscountRejection::PerUserCap);
            }
        }
        Ok(())
    }

    fn amount_for(&self, total: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Percent => {
                let amount = percent_of(total, self.value);
                match self.max_discount_amount {
                    Some(cap) => amount.min(cap),
                    None => amount,
                }
            }
            DiscountType::Fixed => self.value,
        };
        raw.clamp(0, total.max(0))
    }
}

/// One confirmed use of a code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountUsage {
    pub id: i32,
    pub code: String,
    pub customer_id: Option<i32>,
    pub booking_id: i32,
    pub used_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn summer20() -> DiscountCode {
        DiscountCode {
            id: 1,
            code: "SUMMER20".into(),
            discount_type: DiscountType::Percent,
            value: 20,
            min_total: 0,
            max_uses: None,
            max_uses_per_user: None,
            max_discount_amount: Some(500_000),
            start_date: d(2025, 5, 1),
            end_date: d(2025, 8, 31),
            is_active: true,
            used_count: 0,
        }
    }

    #[test]
    fn percent_discount_is_capped() {
        let code = summer20();
        assert_eq!(code.evaluate(3_000_000, d(2025, 6, 1), None), Ok(500_000));
        assert_eq!(code.evaluate(1_000_000, d(2025, 6, 1), None), Ok(200_000));
    }

    #[test]
    fn fixed_discount_never_exceeds_total() {
        let code = DiscountCode {
            discount_type: DiscountType::Fixed,
            value: 500_000,
            max_discount_amount: None,
            ..summer20()
        };
        assert_eq!(code.evaluate(300_000, d(2025, 6, 1), None), Ok(300_000));
    }

    #[test]
    fn validity_window_is_inclusive() {
        let code = summer20();
        assert!(code.evaluate(1_000, d(2025, 5, 1), None).is_ok());
        assert!(code.evaluate(1_000, d(2025, 8, 31), None).is_ok());
        assert_eq!(
            code.evaluate(1_000, d(2025, 4, 30), None),
            Err(DiscountRejection::NotYetValid)
        );
        assert_eq!(
            code.evaluate(1_000, d(2025, 9, 1), None),
            Err(DiscountRejection::Expired)
        );
    }

    #[test]
    fn rejection_reasons() {
        let today = d(2025, 6, 1);

        let inactive = DiscountCode {
            is_active: false,
            ..summer20()
        };
        assert_eq!(
            inactive.evaluate(1_000, today, None),
            Err(DiscountRejection::Inactive)
        );

        let minimum = DiscountCode {
            min_total: 2_000_000,
            ..summer20()
        };
        assert_eq!(
            minimum.evaluate(1_999_999, today, None),
            Err(DiscountRejection::BelowMinimum)
        );

        let exhausted = DiscountCode {
            max_uses: Some(10),
            used_count: 10,
            ..summer20()
        };
        assert_eq!(
            exhausted.evaluate(1_000, today, None),
            Err(DiscountRejection::Exhausted)
        );
    }

    #[test]
    fn per_user_cap_applies_to_known_customers_only() {
        let code = DiscountCode {
            max_uses_per_user: Some(1),
            ..summer20()
        };
        let today = d(2025, 6, 1);
        assert!(code.evaluate(1_000_000, today, Some(0)).is_ok());
        assert_eq!(
            code.evaluate(1_000_000, today, Some(1)),
            Err(DiscountRejection::PerUserCap)
        );
        assert!(code.evaluate(1_000_000, today, None).is_ok());
    }

    #[test]
    fn usage_caps_ignore_the_validity_window() {
        let lapsed = DiscountCode {
            end_date: d(2025, 5, 31),
            max_uses: Some(2),
            max_uses_per_user: Some(1),
            used_count: 1,
            ..summer20()
        };
        assert_eq!(lapsed.check_usage(Some(0)), Ok(()));
        assert_eq!(lapsed.check_usage(Some(1)), Err(DiscountRejection::PerUserCap));

        let spent = DiscountCode {
            used_count: 2,
            ..lapsed
        };
        assert_eq!(spent.check_usage(None), Err(DiscountRejection::Exhausted));
    }
}
