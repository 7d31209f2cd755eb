//! Database entities module

pub mod booking;
pub mod booking_item;
pub mod booking_service;
pub mod discount_code;
pub mod discount_usage;
pub mod hotel_service;
pub mod incident_charge;
pub mod refund_request;
pub mod room;
pub mod room_type;

pub use booking::Entity as Booking;
pub use booking_item::Entity as BookingItem;
pub use booking_service::Entity as BookingService;
pub use discount_code::Entity as DiscountCode;
pub use discount_usage::Entity as DiscountUsage;
pub use hotel_service::Entity as HotelService;
pub use incident_charge::Entity as IncidentCharge;
pub use refund_request::Entity as RefundRequest;
pub use room::Entity as Room;
pub use room_type::Entity as RoomType;
