//! Expiry reconciler: relabels admissions whose codes aged out unredeemed.
//!
//! Every 10 seconds it scans durable `success` attempts older than the
//! code TTL plus margin, probes the reservation store for each code, and
//! marks the vanished ones `expired` in one statement. The sale counters
//! are deliberately left untouched: an admitted item stays counted
//! whether or not it was redeemed, because overselling is worse than
//! under-fulfilling.

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::services::reservation_store::ReservationStore;
use crate::services::sale_store;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10);
/// Code TTL is 20 s; the margin keeps a healthy distance from in-flight
/// redemptions and writer flush latency.
const EXPIRY_MARGIN_SECONDS: i64 = 50;
const SWEEP_LIMIT: u64 = 100;

pub async fn run(
    db: DatabaseConnection,
    reservations: ReservationStore,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("expiry reconciler stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep(&db, &reservations).await {
                    error!(error = %e, "expiry sweep failed");
                }
            }
        }
    }
}

async fn sweep(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let attempts = sale_store::stale_success_attempts(db, EXPIRY_MARGIN_SECONDS, SWEEP_LIMIT).await?;
    if attempts.is_empty() {
        debug!("no stale checkout attempts found");
        return Ok(());
    }

    let mut expired_ids = Vec::new();
    for attempt in &attempts {
        let Some(code) = &attempt.code else {
            continue;
        };
        if reservations.get_code(code).await?.is_none() {
            expired_ids.push(attempt.id);
        }
    }

    if expired_ids.is_empty() {
        return Ok(());
    }

    let updated = sale_store::mark_attempts_expired(db, &expired_ids).await?;
    info!(count = updated, "marked stale checkout attempts expired");
    Ok(())
}
