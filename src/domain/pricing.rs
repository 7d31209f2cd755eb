//! Pricing and refund arithmetic
//!
//! All amounts are `i64` in the smallest currency unit. Percentages go
//! through `rust_decimal` and round toward zero.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::calendar::DateRange;
use super::room::{RefundPolicy, RoomType};
use super::DomainResult;
use crate::shared::DomainError;

/// `percent`% of `amount`, truncated.
pub fn percent_of(amount: i64, percent: i64) -> i64 {
    let value = Decimal::from(amount) * Decimal::from(percent) / Decimal::ONE_HUNDRED;
    value
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NightlyRate {
    pub base_price: i64,
    /// Surcharge per extra adult per night
    pub extra_adult_fee: i64,
    /// Surcharge per extra child per night
    pub extra_child_fee: i64,
    pub extra_adults: i64,
    pub extra_children: i64,
    pub nightly_price: i64,
}

pub fn nightly_rate(room_type: &RoomType, adults: i32, children: i32) -> DomainResult<NightlyRate> {
    if !room_type.accepts(adults, children) {
        return Err(DomainError::Validation(format!(
            "room type '{}' accepts at most {} adults and {} children (requested {adults} adults, {children} children)",
            room_type.name, room_type.max_adults, room_type.max_children
        )));
    }

    let extra_adults = i64::from((adults - room_type.base_adults).max(0));
    let extra_children = i64::from((children - room_type.base_children).max(0));
    let nightly_price = room_type.base_price
        + room_type.extra_adult_fee * extra_adults
        + room_type.extra_child_fee * extra_children;

    Ok(NightlyRate {
        base_price: room_type.base_price,
        extra_adult_fee: room_type.extra_adult_fee,
        extra_child_fee: room_type.extra_child_fee,
        extra_adults,
        extra_children,
        nightly_price,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemPrice {
    pub rate: NightlyRate,
    pub nights: i64,
    pub item_total: i64,
}

pub fn price_item(
    room_type: &RoomType,
    range: &DateRange,
    adults: i32,
    children: i32,
) -> DomainResult<ItemPrice> {
    let rate = nightly_rate(room_type, adults, children)?;
    let nights = range.nights();
    Ok(ItemPrice {
        rate,
        nights,
        item_total: rate.nightly_price * nights,
    })
}

pub fn service_total(unit_price: i64, quantity: i32) -> i64 {
    unit_price * i64::from(quantity.max(0))
}

/// Refundable part of `paid` when cancelling at `cancelled_at` a stay that
/// begins at `check_in_at`. Eligible only strictly before the deadline.
pub fn refund_for(
    policy: &RefundPolicy,
    paid: i64,
    check_in_at: DateTime<Utc>,
    cancelled_at: DateTime<Utc>,
) -> i64 {
    if !policy.refundable || paid <= 0 {
        return 0;
    }
    let deadline = check_in_at - Duration::hours(i64::from(policy.refund_deadline_hours));
    if cancelled_at < deadline {
        percent_of(paid, i64::from(policy.refund_percent.clamp(0, 100)))
    } else {
        0
    }
}

/// Splits `amount` across `weights` proportionally. Shares sum to `amount`
/// exactly; the rounding remainder goes to the heaviest entries first.
pub fn allocate(amount: i64, weights: &[i64]) -> Vec<i64> {
    let total: i128 = weights.iter().map(|w| i128::from((*w).max(0))).sum();
    if total == 0 || amount <= 0 {
        return vec![0; weights.len()];
    }

    let mut shares: Vec<i64> = weights
        .iter()
        .map(|w| (i128::from(amount) * i128::from((*w).max(0)) / total) as i64)
        .collect();

    let mut remainder = amount - shares.iter().sum::<i64>();
    let mut order: Vec<usize> = (0..weights.len()).filter(|i| weights[*i] > 0).collect();
    order.sort_by(|a, b| weights[*b].cmp(&weights[*a]));
    for i in order.iter().cycle() {
        if remainder == 0 {
            break;
        }
        shares[*i] += 1;
        remainder -= 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn room_type() -> RoomType {
        RoomType {
            id: 1,
            name: "Deluxe".into(),
            base_price: 1_000_000,
            base_adults: 2,
            base_children: 0,
            max_adults: 3,
            max_children: 2,
            extra_adult_fee: 200_000,
            extra_child_fee: 100_000,
            refund_policy: RefundPolicy {
                refundable: true,
                refund_percent: 80,
                refund_deadline_hours: 24,
            },
        }
    }

    #[test]
    fn nightly_price_adds_occupancy_surcharges() {
        let rt = room_type();
        assert_eq!(nightly_rate(&rt, 2, 0).unwrap().nightly_price, 1_000_000);
        let rate = nightly_rate(&rt, 3, 2).unwrap();
        assert_eq!(rate.extra_adults, 1);
        assert_eq!(rate.extra_children, 2);
        assert_eq!(rate.nightly_price, 1_400_000);
        assert!(nightly_rate(&rt, 4, 0).is_err());
    }

    #[test]
    fn item_total_is_nightly_times_nights() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
        )
        .unwrap();
        let price = price_item(&room_type(), &range, 3, 0).unwrap();
        assert_eq!(price.nights, 3);
        assert_eq!(price.item_total, 3_600_000);
    }

    #[test]
    fn percent_truncates() {
        assert_eq!(percent_of(3_000_000, 20), 600_000);
        assert_eq!(percent_of(999, 15), 149);
        assert_eq!(percent_of(0, 80), 0);
    }

    #[test]
    fn refund_window() {
        let policy = room_type().refund_policy;
        let check_in = Utc.with_ymd_and_hms(2025, 6, 10, 7, 0, 0).unwrap();

        let early = check_in - Duration::hours(48);
        assert_eq!(refund_for(&policy, 2_000_000, check_in, early), 1_600_000);

        let late = check_in - Duration::hours(2);
        assert_eq!(refund_for(&policy, 2_000_000, check_in, late), 0);

        let at_deadline = check_in - Duration::hours(24);
        assert_eq!(refund_for(&policy, 2_000_000, check_in, at_deadline), 0);
    }

    #[test]
    fn non_refundable_policy_never_refunds() {
        let check_in = Utc.with_ymd_and_hms(2025, 6, 10, 7, 0, 0).unwrap();
        let early = check_in - Duration::days(30);
        assert_eq!(
            refund_for(&RefundPolicy::non_refundable(), 2_000_000, check_in, early),
            0
        );
    }

    #[test]
    fn allocation_is_proportional_and_exact() {
        assert_eq!(allocate(1_000, &[1, 1]), vec![500, 500]);
        assert_eq!(allocate(1_000, &[3, 1]), vec![750, 250]);

        let shares = allocate(100, &[1, 1, 1]);
        assert_eq!(shares.iter().sum::<i64>(), 100);
        assert_eq!(shares, vec![34, 33, 33]);

        assert_eq!(allocate(100, &[0, 0]), vec![0, 0]);
        assert_eq!(allocate(100, &[0, 5]), vec![0, 100]);
    }
}
