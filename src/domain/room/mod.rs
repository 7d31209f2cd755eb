//! Room catalog
//!
//! Room types, rooms and bookable extras, plus the read-only repository.

pub mod model;
pub mod repository;

pub use model::{HotelService, RefundPolicy, Room, RoomStatus, RoomType};
pub use repository::CatalogRepository;
