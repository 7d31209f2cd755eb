//! Room catalog entities
//!
//! The catalog is managed elsewhere; this engine only reads it, apart from
//! the coarse room status it keeps in step with stays.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse housekeeping status. Overlap checks never rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Booked,
    Occupied,
    Cleaning,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Occupied => "occupied",
            Self::Cleaning => "cleaning",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "occupied" => Ok(Self::Occupied),
            "cleaning" => Ok(Self::Cleaning),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("unknown room status '{other}'")),
        }
    }
}

/// Refund terms attached to a room type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPolicy {
    pub refundable: bool,
    /// Share of the paid amount returned, 0..=100
    pub refund_percent: i32,
    /// Cancellation must happen more than this many hours before check-in
    pub refund_deadline_hours: i32,
}

impl RefundPolicy {
    pub fn non_refundable() -> Self {
        Self {
            refundable: false,
            refund_percent: 0,
            refund_deadline_hours: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    pub id: i32,
    pub name: String,
    /// Per night, smallest currency unit
    pub base_price: i64,
    pub base_adults: i32,
    pub base_children: i32,
    pub max_adults: i32,
    pub max_children: i32,
    pub extra_adult_fee: i64,
    pub extra_child_fee: i64,
    pub refund_policy: RefundPolicy,
}

impl RoomType {
    pub fn accepts(&self, adults: i32, children: i32) -> bool {
        adults >= 1 && children >= 0 && adults <= self.max_adults && children <= self.max_children
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i32,
    pub room_number: String,
    pub room_type_id: i32,
    pub status: RoomStatus,
}

impl Room {
    pub fn is_bookable(&self) -> bool {
        self.status != RoomStatus::Maintenance
    }
}

/// An extra the guest can add to a booking (breakfast, airport pickup...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelService {
    pub id: i32,
    pub name: String,
    /// Per unit, smallest currency unit
    pub price: i64,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deluxe() -> RoomType {
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
            refund_policy: RefundPolicy::non_refundable(),
        }
    }

    #[test]
    fn occupancy_limits() {
        let rt = deluxe();
        assert!(rt.accepts(2, 0));
        assert!(rt.accepts(3, 2));
        assert!(!rt.accepts(4, 0));
        assert!(!rt.accepts(2, 3));
        assert!(!rt.accepts(0, 1));
    }

    #[test]
    fn maintenance_rooms_are_not_bookable() {
        let mut room = Room {
            id: 101,
            room_number: "101".into(),
            room_type_id: 1,
            status: RoomStatus::Cleaning,
        };
        assert!(room.is_bookable());
        room.status = RoomStatus::Maintenance;
        assert!(!room.is_bookable());
    }

    #[test]
    fn status_parse() {
        assert_eq!("occupied".parse::<RoomStatus>(), Ok(RoomStatus::Occupied));
        assert!("dirty".parse::<RoomStatus>().is_err());
    }
}
