//! Create booking tables
//!
//! Bookings, their room items, service lines and incident charges.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_catalog::Rooms;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::CustomerId).integer())
                    .col(ColumnDef::new(Bookings::GuestName).string().not_null())
                    .col(
                        ColumnDef::new(Bookings::StayStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Bookings::PaymentMethod).string())
                    .col(
                        ColumnDef::new(Bookings::BookingMethod)
                            .string()
                            .not_null()
                            .default("online"),
                    )
                    .col(ColumnDef::new(Bookings::Subtotal).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::DiscountCode).string())
                    .col(
                        ColumnDef::new(Bookings::DiscountAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Bookings::TotalPrice).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::PaidAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::RefundableAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Bookings::CancelReason).string())
                    .col(ColumnDef::new(Bookings::CanceledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Bookings::CanceledBy).string())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_stay_status")
                    .table(Bookings::Table)
                    .col(Bookings::StayStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_customer")
                    .table(Bookings::Table)
                    .col(Bookings::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BookingItems::BookingId).integer().not_null())
                    .col(ColumnDef::new(BookingItems::RoomId).integer().not_null())
                    .col(ColumnDef::new(BookingItems::CheckIn).date().not_null())
                    .col(ColumnDef::new(BookingItems::CheckOut).date().not_null())
                    .col(ColumnDef::new(BookingItems::Adults).integer().not_null())
                    .col(
                        ColumnDef::new(BookingItems::Children)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BookingItems::NightlyPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingItems::ExtraAdultFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BookingItems::ExtraChildFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(BookingItems::Nights).integer().not_null())
                    .col(
                        ColumnDef::new(BookingItems::ItemTotal)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingItems::CancelledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(BookingItems::CancelReason).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_items_booking")
                            .from(BookingItems::Table, BookingItems::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_items_room")
                            .from(BookingItems::Table, BookingItems::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Overlap checks filter on room and date range
        manager
            .create_index(
                Index::create()
                    .name("idx_booking_items_room_dates")
                    .table(BookingItems::Table)
                    .col(BookingItems::RoomId)
                    .col(BookingItems::CheckIn)
                    .col(BookingItems::CheckOut)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_items_booking")
                    .table(BookingItems::Table)
                    .col(BookingItems::BookingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingServices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingServices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BookingServices::BookingId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingServices::ServiceId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingServices::Name).string().not_null())
                    .col(
                        ColumnDef::new(BookingServices::UnitPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingServices::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingServices::Total)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_services_booking")
                            .from(BookingServices::Table, BookingServices::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IncidentCharges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncidentCharges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IncidentCharges::BookingId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentCharges::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentCharges::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncidentCharges::Settled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(IncidentCharges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incident_charges_booking")
                            .from(IncidentCharges::Table, IncidentCharges::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IncidentCharges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BookingServices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BookingItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    CustomerId,
    GuestName,
    StayStatus,
    PaymentStatus,
    PaymentMethod,
    BookingMethod,
    Subtotal,
    DiscountCode,
    DiscountAmount,
    TotalPrice,
    PaidAmount,
    RefundableAmount,
    CancelReason,
    CanceledAt,
    CanceledBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum BookingItems {
    Table,
    Id,
    BookingId,
    RoomId,
    CheckIn,
    CheckOut,
    Adults,
    Children,
    NightlyPrice,
    ExtraAdultFee,
    ExtraChildFee,
    Nights,
    ItemTotal,
    CancelledAt,
    CancelReason,
}

#[derive(Iden)]
pub enum BookingServices {
    Table,
    Id,
    BookingId,
    ServiceId,
    Name,
    UnitPrice,
    Quantity,
    Total,
}

#[derive(Iden)]
pub enum IncidentCharges {
    Table,
    Id,
    BookingId,
    Description,
    Amount,
    Settled,
    CreatedAt,
}
