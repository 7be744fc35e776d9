//! Migration to create the sales table
//!
//! One row per hourly sale window; `ended_at` stays NULL while the sale is live.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(pk_auto(Sales::Id))
                    .col(string(Sales::ItemName))
                    .col(string_len(Sales::ImageUrl, 500))
                    .col(timestamp_with_time_zone(Sales::StartedAt))
                    .col(timestamp_with_time_zone_null(Sales::EndedAt))
                    .to_owned(),
            )
            .await?;

        // The scheduler resolves the live sale as "newest row with ended_at NULL"
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_started_at")
                    .table(Sales::Table)
                    .col(Sales::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sales {
    Table,
    Id,
    ItemName,
    ImageUrl,
    StartedAt,
    EndedAt,
}
