//! Migration to create the purchases table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(Purchases::UserId, 50))
                    .col(integer(Purchases::SaleId))
                    .col(string_len(Purchases::ItemId, 50))
                    .col(
                        timestamp_with_time_zone(Purchases::PurchasedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_sale")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::SaleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_item")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::ItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    SaleId,
    ItemId,
    PurchasedAt,
}
