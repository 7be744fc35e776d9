//! Background writer that drains the checkout-attempt queue into Postgres.
//!
//! Accumulates records into batches of up to 100 and flushes on a full
//! batch or a 1-second tick. A failed batch falls back to per-row inserts
//! so one poison record cannot sink its neighbors.

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::models::pipeline::AttemptRecord;
use crate::services::sale_store;

const BATCH_SIZE: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(
    db: DatabaseConnection,
    mut rx: mpsc::Receiver<AttemptRecord>,
    shutdown: CancellationToken,
) {
    let mut batch: Vec<AttemptRecord> = Vec::with_capacity(BATCH_SIZE);
    let mut ticker = interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if !batch.is_empty() {
                    debug!(count = batch.len(), "flushing remaining attempts");
                    flush(&db, &mut batch).await;
                }
                info!("attempt writer stopped");
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
                        info!("attempt queue closed, writer stopped");
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

async fn flush(db: &DatabaseConnection, batch: &mut Vec<AttemptRecord>) {
    if let Err(e) = sale_store::insert_attempts(db, batch).await {
        error!(
            error = %e,
            count = batch.len(),
            "attempt batch insert failed, retrying rows individually"
        );
        for record in batch.iter() {
            if let Err(e) = sale_store::insert_attempt(db, record).await {
                error!(
                    error = %e,
                    user_id = %record.user_id,
                    status = record.status.as_str(),
                    "failed to persist checkout attempt"
                );
            }
        }
    }
    batch.clear();
}
