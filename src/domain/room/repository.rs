//! Catalog repository interface (read side)

use async_trait::async_trait;

use super::model::{HotelService, Room, RoomType};
use crate::domain::DomainResult;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_room(&self, id: i32) -> DomainResult<Option<Room>>;

    async fn list_rooms(&self) -> DomainResult<Vec<Room>>;

    async fn find_room_type(&self, id: i32) -> DomainResult<Option<RoomType>>;

    async fn list_room_types(&self) -> DomainResult<Vec<RoomType>>;

    async fn find_service(&self, id: i32) -> DomainResult<Option<HotelService>>;
}
