//! Create catalog tables
//!
//! Room types (pricing and refund terms), rooms and bookable extras.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoomTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoomTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoomTypes::Name).string().not_null())
                    .col(ColumnDef::new(RoomTypes::BasePrice).big_integer().not_null())
                    .col(
                        ColumnDef::new(RoomTypes::BaseAdults)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::BaseChildren)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::MaxAdults)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::MaxChildren)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::ExtraAdultFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::ExtraChildFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::Refundable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::RefundPercent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RoomTypes::RefundDeadlineHours)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rooms::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Rooms::RoomNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Rooms::RoomTypeId).integer().not_null())
                    .col(
                        ColumnDef::new(Rooms::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rooms_room_type")
                            .from(Rooms::Table, Rooms::RoomTypeId)
                            .to(RoomTypes::Table, RoomTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HotelServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HotelServices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HotelServices::Name).string().not_null())
                    .col(ColumnDef::new(HotelServices::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(HotelServices::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HotelServices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoomTypes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum RoomTypes {
    Table,
    Id,
    Name,
    BasePrice,
    BaseAdults,
    BaseChildren,
    MaxAdults,
    MaxChildren,
    ExtraAdultFee,
    ExtraChildFee,
    Refundable,
    RefundPercent,
    RefundDeadlineHours,
}

#[derive(Iden)]
pub enum Rooms {
    Table,
    Id,
    RoomNumber,
    RoomTypeId,
    Status,
}

#[derive(Iden)]
pub enum HotelServices {
    Table,
    Id,
    Name,
    Price,
    IsActive,
}
