pub mod availability;
pub mod booking;
pub mod calendar;
pub mod discount;
pub mod policy;
pub mod pricing;
pub mod refund;
pub mod repositories;
pub mod room;
pub mod status;

// Re-export commonly used types
pub use availability::RoomHold;
pub use booking::{Actor, Booking, BookingItem, BookingMethod, PaymentStatus};
pub use calendar::{DateRange, HotelCalendar};
pub use discount::{DiscountCode, DiscountRejection, DiscountType};
pub use policy::StayPolicy;
pub use refund::{BankDetails, RefundRequest, RefundStatus};
pub use repositories::{DomainResult, RepositoryProvider, UnitOfWork};
pub use room::{HotelService, RefundPolicy, Room, RoomStatus, RoomType};
pub use status::{StatusCodeTable, StayStatus};

pub use crate::shared::errors::DomainError;
