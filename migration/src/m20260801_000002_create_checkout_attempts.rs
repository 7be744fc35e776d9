//! Migration to create the checkout_attempts table
//!
//! Every admission attempt lands here in any terminal status; the expiry
//! reconciler later promotes stale `success` rows to `expired`.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckoutAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckoutAttempts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(CheckoutAttempts::UserId, 50))
                    .col(integer(CheckoutAttempts::SaleId))
                    .col(string_len(CheckoutAttempts::ItemId, 50))
                    .col(string_len_null(CheckoutAttempts::Code, 32))
                    .col(string_len(CheckoutAttempts::Status, 30))
                    .col(
                        timestamp_with_time_zone(CheckoutAttempts::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Code lookups by the purchase-promotion path
        manager
            .create_index(
                Index::create()
                    .name("idx_checkout_attempts_code")
                    .table(CheckoutAttempts::Table)
                    .col(CheckoutAttempts::Code)
                    .to_owned(),
            )
            .await?;

        // The reconciler sweeps by (status, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_checkout_attempts_status_created_at")
                    .table(CheckoutAttempts::Table)
                    .col(CheckoutAttempts::Status)
                    .col(CheckoutAttempts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Per-user per-sale accounting
        manager
            .create_index(
                Index::create()
                    .name("idx_checkout_attempts_user_sale")
                    .table(CheckoutAttempts::Table)
                    .col(CheckoutAttempts::UserId)
                    .col(CheckoutAttempts::SaleId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckoutAttempts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CheckoutAttempts {
    Table,
    Id,
    UserId,
    SaleId,
    ItemId,
    Code,
    Status,
    CreatedAt,
}
