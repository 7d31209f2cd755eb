//! Create refund_requests table

use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_bookings::Bookings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RefundRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefundRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RefundRequests::BookingId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RefundRequests::BookingItemId).integer())
                    .col(
                        ColumnDef::new(RefundRequests::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RefundRequests::BankName).string().not_null())
                    .col(
                        ColumnDef::new(RefundRequests::AccountNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefundRequests::AccountHolder)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefundRequests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(RefundRequests::ReceiptRef).string())
                    .col(ColumnDef::new(RefundRequests::AdminNotes).string())
                    .col(
                        ColumnDef::new(RefundRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefundRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refund_requests_booking")
                            .from(RefundRequests::Table, RefundRequests::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refund_requests_booking_status")
                    .table(RefundRequests::Table)
                    .col(RefundRequests::BookingId)
                    .col(RefundRequests::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RefundRequests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum RefundRequests {
    Table,
    Id,
    BookingId,
    BookingItemId,
    Amount,
    BankName,
    AccountNumber,
    AccountHolder,
    Status,
    ReceiptRef,
    AdminNotes,
    CreatedAt,
    UpdatedAt,
}
