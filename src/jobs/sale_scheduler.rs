//! Sale scheduler: hourly rotation with crash recovery on startup.
//!
//! On boot the scheduler reconciles the three places a sale can live
//! (durable store rows, reservation-store keys, the active pointer); from
//! then on it opens a fresh sale at each top-of-hour. Only this task
//! creates sales or moves the active pointer.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, Local, Timelike, Utc};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::services::item_catalog;
use crate::services::reservation_store::{ReservationStore, INITIAL_STOCK};
use crate::services::sale_cache::{SaleCache, SaleItem};
use crate::services::sale_store;

type SchedulerError = Box<dyn std::error::Error + Send + Sync>;

const RECOVERY_MAX_ATTEMPTS: u64 = 3;
const ROTATE_MAX_ATTEMPTS: u64 = 5;

pub async fn run(
    db: DatabaseConnection,
    reservations: ReservationStore,
    sale_cache: SaleCache,
    shutdown: CancellationToken,
) {
    info!("sale scheduler starting with recovery check");

    if let Err(e) = recover_sale_state(&db, &reservations, &sale_cache).await {
        // Not fatal: the next top-of-hour rotation starts a fresh sale.
        error!(error = %e, "sale state recovery failed, continuing with normal scheduling");
    }

    loop {
        let wait = time_until_next_hour(Local::now());
        info!(wait_secs = wait.as_secs(), "waiting until next sale window");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("sale scheduler stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {
                start_new_sale_with_retries(&db, &reservations, &sale_cache, &shutdown).await;
            }
        }
    }
}

/// Bounded recovery with linear backoff (1 s, 2 s, 3 s).
async fn recover_sale_state(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
    sale_cache: &SaleCache,
) -> Result<(), SchedulerError> {
    for attempt in 1..=RECOVERY_MAX_ATTEMPTS {
        match try_recover_sale_state(db, reservations, sale_cache).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt == RECOVERY_MAX_ATTEMPTS => return Err(e),
            Err(e) => {
                error!(
                    attempt,
                    max_attempts = RECOVERY_MAX_ATTEMPTS,
                    error = %e,
                    "recovery attempt failed"
                );
                tokio::time::sleep(StdDuration::from_secs(attempt)).await;
            }
        }
    }
    Err("sale state recovery exhausted retries".into())
}

async fn try_recover_sale_state(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
    sale_cache: &SaleCache,
) -> Result<(), SchedulerError> {
    let last_started = sale_store::last_sale_started_at(db).await?;
    let stale = match last_started {
        None => true,
        Some(started_at) => Utc::now() - started_at > Duration::hours(1),
    };
    if stale {
        return execute_new_sale(db, reservations, sale_cache).await;
    }

    // The durable store says a sale should be live within this hour.
    match reservations.active_sale_id().await? {
        Some(sale_id) => {
            info!(sale_id, "current sale is active");
            Ok(())
        }
        None => {
            warn!("reservation-store sale state missing, restoring");
            match sale_store::active_sale_id(db).await? {
                Some(sale_id) => {
                    restore_reservation_state(db, reservations, sale_cache, sale_id).await
                }
                None => execute_new_sale(db, reservations, sale_cache).await,
            }
        }
    }
}

/// Bounded rotation retry with backoff of 2n seconds.
async fn start_new_sale_with_retries(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
    sale_cache: &SaleCache,
    shutdown: &CancellationToken,
) {
    for attempt in 1..=ROTATE_MAX_ATTEMPTS {
        match execute_new_sale(db, reservations, sale_cache).await {
            Ok(()) => {
                info!(attempt, "new sale started");
                return;
            }
            Err(e) => {
                error!(
                    attempt,
                    max_attempts = ROTATE_MAX_ATTEMPTS,
                    error = %e,
                    "failed to start new sale"
                );
                if attempt == ROTATE_MAX_ATTEMPTS {
                    error!("giving up on this sale window");
                    return;
                }
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(StdDuration::from_secs(attempt * 2)) => {}
                }
            }
        }
    }
}

async fn execute_new_sale(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
    sale_cache: &SaleCache,
) -> Result<(), SchedulerError> {
    let scheduled_id = scheduled_sale_id(Local::now());
    let (item_name, image_url) = item_catalog::generate_item(scheduled_id);

    // The durable store assigns the authoritative sale id.
    let sale_id = sale_store::insert_sale(db, &item_name, &image_url).await?;
    sale_cache.insert(
        sale_id,
        SaleItem {
            item_name,
            image_url,
        },
    );

    // Counters and pointer move in one atomic unit; keys of the prior
    // sale are swept afterwards so its user counters cannot leak in.
    reservations.init_sale(sale_id, INITIAL_STOCK, 0).await?;
    let (user_keys, code_keys) = reservations.rotate_cleanup().await?;
    debug!(user_keys, code_keys, "cleared prior sale state");

    // Closing the superseded sale rows is best-effort.
    match sale_store::end_sales_before(db, sale_id).await {
        Ok(closed) if closed > 0 => debug!(closed, "closed superseded sales"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "failed to close superseded sales"),
    }

    info!(sale_id, "new sale started");
    Ok(())
}

/// Recreate the reservation-store keys for a sale that was live when the
/// process died. The counters are reconstructed from the attempts table
/// so already-admitted items are not resold.
async fn restore_reservation_state(
    db: &DatabaseConnection,
    reservations: &ReservationStore,
    sale_cache: &SaleCache,
    sale_id: i32,
) -> Result<(), SchedulerError> {
    let sale = sale_store::sale_by_id(db, sale_id)
        .await?
        .ok_or("active sale missing from durable store")?;
    sale_cache.insert(
        sale_id,
        SaleItem {
            item_name: sale.item_name,
            image_url: sale.image_url,
        },
    );

    let items_sold = sale_store::admitted_count(db, sale_id)
        .await?
        .min(INITIAL_STOCK);
    let stock = INITIAL_STOCK - items_sold;

    info!(sale_id, stock, items_sold, "restoring reservation state for live sale");
    reservations.init_sale(sale_id, stock, items_sold).await?;
    Ok(())
}

/// Schedule-derived sale id: year*10000 + day_of_year*100 + hour.
fn scheduled_sale_id(now: DateTime<Local>) -> i32 {
    now.year() * 10_000 + now.ordinal() as i32 * 100 + now.hour() as i32
}

/// Wall-clock duration until the next top-of-hour. Exactly on a boundary
/// this returns a full hour; startup recovery covers the current window.
fn time_until_next_hour(now: DateTime<Local>) -> StdDuration {
    let into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    StdDuration::from_secs(3600 - into_hour)
        .saturating_sub(StdDuration::from_nanos(u64::from(now.nanosecond())))
}
