//! Create discount tables
//!
//! Discount codes and the per-use ledger that backs per-customer caps.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DiscountCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscountCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::DiscountType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DiscountCodes::Value).big_integer().not_null())
                    .col(
                        ColumnDef::new(DiscountCodes::MinTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DiscountCodes::MaxUses).integer())
                    .col(ColumnDef::new(DiscountCodes::MaxUsesPerUser).integer())
                    .col(ColumnDef::new(DiscountCodes::MaxDiscountAmount).big_integer())
                    .col(ColumnDef::new(DiscountCodes::StartDate).date().not_null())
                    .col(ColumnDef::new(DiscountCodes::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(DiscountCodes::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(DiscountCodes::UsedCount)
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
                    .table(DiscountUsages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscountUsages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DiscountUsages::Code).string().not_null())
                    .col(ColumnDef::new(DiscountUsages::CustomerId).integer())
                    .col(
                        ColumnDef::new(DiscountUsages::BookingId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_discount_usages_code_customer")
                    .table(DiscountUsages::Table)
                    .col(DiscountUsages::Code)
                    .col(DiscountUsages::CustomerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DiscountUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DiscountCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum DiscountCodes {
    Table,
    Id,
    Code,
    DiscountType,
    Value,
    MinTotal,
    MaxUses,
    MaxUsesPerUser,
    MaxDiscountAmount,
    StartDate,
    EndDate,
    Status,
    UsedCount,
}

#[derive(Iden)]
pub enum DiscountUsages {
    Table,
    Id,
    Code,
    CustomerId,
    BookingId,
    UsedAt,
}
