//! Background writer that drains the purchase queue into Postgres.
//!
//! Same batching discipline as the attempt writer. After each flush the
//! matching `success` attempts are promoted to `completed`, so the expiry
//! reconciler only relabels admissions that truly went unredeemed.

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::models::pipeline::PurchaseRecord;
use crate::services::sale_store;

const BATCH_SIZE: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(
    db: DatabaseConnection,
    mut rx: mpsc::Receiver<PurchaseRecord>,
    shutdown: CancellationToken,
) {
    let mut batch: Vec<PurchaseRecord> = Vec::with_capacity(BATCH_SIZE);
    let mut ticker = interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if !batch.is_empty() {
                    debug!(count = batch.len(), "flushing remaining purchases");
                    flush(&db, &mut batch).await;
                }
                info!("purchase writer stopped");
                return;
            }
            received = rx.recv() => {
                match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= BATCH_SIZE {
                            flush(&db, &mut batch).await;
                        }
                    }
                    None => {
                        if !batch.is_empty() {
                            flush(&db, &mut batch).await;
                        }
                        info!("purchase queue closed, writer stopped");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush(&db, &mut batch).await;
                }
            }
        }
    }
}

async fn flush(db: &DatabaseConnection, batch: &mut Vec<PurchaseRecord>) {
    if let Err(e) = sale_store::insert_purchases(db, batch).await {
        error!(
            error = %e,
            count = batch.len(),
            "purchase batch insert failed, retrying rows individually"
        );
        for record in batch.iter() {
            if let Err(e) = sale_store::insert_purchase(db, record).await {
                error!(
                    error = %e,
                    user_id = %record.user_id,
                    "failed to persist purchase"
                );
            }
        }
    }

    let codes: Vec<String> = batch.iter().map(|p| p.code.clone()).collect();
    match sale_store::mark_attempts_completed(db, &codes).await {
        Ok(promoted) if promoted > 0 => {
            debug!(promoted, "promoted redeemed attempts to completed");
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "failed to promote redeemed attempts"),
    }

    batch.clear();
}
