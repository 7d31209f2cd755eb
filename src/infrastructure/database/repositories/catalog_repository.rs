//! SeaORM implementation of CatalogRepository

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use super::convert::{db_err, room_to_domain, room_type_to_domain, service_to_domain};
use crate::domain::room::{CatalogRepository, HotelService, Room, RoomType};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{hotel_service, room, room_type};

pub struct SeaOrmCatalogRepository {
    db: DatabaseConnection,
}

impl SeaOrmCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmCatalogRepository {
    async fn find_room(&self, id: i32) -> DomainResult<Option<Room>> {
        room::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(room_to_domain)
            .transpose()
    }

    async fn list_rooms(&self) -> DomainResult<Vec<Room>> {
        room::Entity::find()
            .order_by_asc(room::Column::RoomNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(room_to_domain)
            .collect()
    }

    async fn find_room_type(&self, id: i32) -> DomainResult<Option<RoomType>> {
        let model = room_type::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(room_type_to_domain))
    }

    async fn list_room_types(&self) -> DomainResult<Vec<RoomType>> {
        let models = room_type::Entity::find()
            .order_by_asc(room_type::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(room_type_to_domain).collect())
    }

    async fn find_service(&self, id: i32) -> DomainResult<Option<HotelService>> {
        let model = hotel_service::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(service_to_domain))
    }
}
