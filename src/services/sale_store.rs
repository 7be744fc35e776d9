//! Durable-store queries for sales, checkout attempts and purchases.
//!
//! Everything here is off the hot path: batch flushes from the pipeline
//! writers, scheduler recovery reads, and the redemption path's cache-miss
//! fallback.

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::prelude::{CheckoutAttempts, Purchases, Sales};
use crate::entities::{checkout_attempts, purchases, sales};
use crate::models::pipeline::{AttemptRecord, AttemptStatus, PurchaseRecord};

/// Statuses that consumed one unit of the sale's counters
const ADMITTED_STATUSES: [&str; 3] = ["success", "completed", "expired"];

/// Insert a new sale row and return its authoritative id.
pub async fn insert_sale(
    db: &DatabaseConnection,
    item_name: &str,
    image_url: &str,
) -> Result<i32, DbErr> {
    let sale = sales::ActiveModel {
        item_name: Set(item_name.to_string()),
        image_url: Set(image_url.to_string()),
        started_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let inserted = sale.insert(db).await?;
    Ok(inserted.id)
}

pub async fn sale_by_id(
    db: &DatabaseConnection,
    sale_id: i32,
) -> Result<Option<sales::Model>, DbErr> {
    Sales::find_by_id(sale_id).one(db).await
}

/// Start time of the most recent sale, if any sale was ever created.
pub async fn last_sale_started_at(
    db: &DatabaseConnection,
) -> Result<Option<DateTime<Utc>>, DbErr> {
    let sale = Sales::find()
        .order_by(sales::Column::StartedAt, Order::Desc)
        .one(db)
        .await?;
    Ok(sale.map(|s| s.started_at.with_timezone(&Utc)))
}

/// Newest sale whose `ended_at` is still NULL.
pub async fn active_sale_id(db: &DatabaseConnection) -> Result<Option<i32>, DbErr> {
    let sale = Sales::find()
        .filter(sales::Column::EndedAt.is_null())
        .order_by(sales::Column::Id, Order::Desc)
        .one(db)
        .await?;
    Ok(sale.map(|s| s.id))
}

/// Close every sale that the given sale supersedes.
pub async fn end_sales_before(db: &DatabaseConnection, current_sale_id: i32) -> Result<u64, DbErr> {
    let result = Sales::update_many()
        .col_expr(sales::Column::EndedAt, Expr::value(Utc::now()))
        .filter(sales::Column::EndedAt.is_null())
        .filter(sales::Column::Id.ne(current_sale_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Insert a batch of checkout attempts as one statement.
pub async fn insert_attempts(
    db: &DatabaseConnection,
    records: &[AttemptRecord],
) -> Result<(), DbErr> {
    if records.is_empty() {
        return Ok(());
    }
    CheckoutAttempts::insert_many(records.iter().map(attempt_model))
        .exec(db)
        .await?;
    Ok(())
}

/// Single-row fallback used to isolate a poison record after a failed batch.
pub async fn insert_attempt(db: &DatabaseConnection, record: &AttemptRecord) -> Result<(), DbErr> {
    attempt_model(record).insert(db).await?;
    Ok(())
}

/// Insert a batch of purchases as one statement.
pub async fn insert_purchases(
    db: &DatabaseConnection,
    records: &[PurchaseRecord],
) -> Result<(), DbErr> {
    if records.is_empty() {
        return Ok(());
    }
    Purchases::insert_many(records.iter().map(purchase_model))
        .exec(db)
        .await?;
    Ok(())
}

/// Single-row fallback used to isolate a poison record after a failed batch.
pub async fn insert_purchase(
    db: &DatabaseConnection,
    record: &PurchaseRecord,
) -> Result<(), DbErr> {
    purchase_model(record).insert(db).await?;
    Ok(())
}

/// Promote redeemed `success` attempts to `completed` by their codes.
pub async fn mark_attempts_completed(
    db: &DatabaseConnection,
    codes: &[String],
) -> Result<u64, DbErr> {
    if codes.is_empty() {
        return Ok(0);
    }
    let result = CheckoutAttempts::update_many()
        .col_expr(
            checkout_attempts::Column::Status,
            Expr::value(AttemptStatus::Completed.as_str()),
        )
        .filter(checkout_attempts::Column::Code.is_in(codes.iter().map(String::as_str)))
        .filter(checkout_attempts::Column::Status.eq(AttemptStatus::Success.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// `success` attempts old enough that their code TTL has certainly lapsed.
pub async fn stale_success_attempts(
    db: &DatabaseConnection,
    older_than_seconds: i64,
    limit: u64,
) -> Result<Vec<checkout_attempts::Model>, DbErr> {
    let cutoff = Utc::now() - Duration::seconds(older_than_seconds);
    CheckoutAttempts::find()
        .filter(checkout_attempts::Column::Status.eq(AttemptStatus::Success.as_str()))
        .filter(checkout_attempts::Column::CreatedAt.lt(cutoff))
        .order_by(checkout_attempts::Column::CreatedAt, Order::Asc)
        .limit(limit)
        .all(db)
        .await
}

/// Mark the given attempts expired in one statement.
pub async fn mark_attempts_expired(db: &DatabaseConnection, ids: &[i64]) -> Result<u64, DbErr> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = CheckoutAttempts::update_many()
        .col_expr(
            checkout_attempts::Column::Status,
            Expr::value(AttemptStatus::Expired.as_str()),
        )
        .filter(checkout_attempts::Column::Id.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// How many admissions were recorded for a sale, across every status that
/// consumed a counter unit. Used to reconstruct the live counters when
/// restoring a mid-hour sale.
pub async fn admitted_count(db: &DatabaseConnection, sale_id: i32) -> Result<i64, DbErr> {
    let count = CheckoutAttempts::find()
        .filter(checkout_attempts::Column::SaleId.eq(sale_id))
        .filter(checkout_attempts::Column::Status.is_in(ADMITTED_STATUSES))
        .count(db)
        .await?;
    Ok(count as i64)
}

fn attempt_model(record: &AttemptRecord) -> checkout_attempts::ActiveModel {
    checkout_attempts::ActiveModel {
        user_id: Set(record.user_id.clone()),
        sale_id: Set(record.sale_id),
        item_id: Set(record.item_id.clone()),
        code: Set(record.code.clone()),
        status: Set(record.status.as_str().to_string()),
        created_at: Set(record.created_at.into()),
        ..Default::default()
    }
}

fn purchase_model(record: &PurchaseRecord) -> purchases::ActiveModel {
    purchases::ActiveModel {
        user_id: Set(record.user_id.clone()),
        sale_id: Set(record.sale_id),
        item_id: Set(record.item_id.clone()),
        purchased_at: Set(record.purchased_at.into()),
        ..Default::default()
    }
}
