// src/lib.rs

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tracing::error;

use models::pipeline::{AttemptRecord, PurchaseRecord};
use services::reservation_store::ReservationStore;
use services::sale_cache::SaleCache;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub reservations: ReservationStore,
    pub sale_cache: SaleCache,
    pub attempts_tx: mpsc::Sender<AttemptRecord>,
    pub purchases_tx: mpsc::Sender<PurchaseRecord>,
}

impl AppState {
    /// Non-blocking handoff to the attempt pipeline; a full queue drops
    /// the record instead of stalling the request.
    pub fn enqueue_attempt(&self, record: AttemptRecord) {
        if self.attempts_tx.try_send(record).is_err() {
            error!("dropped checkout attempt: queue full");
        }
    }

    /// Non-blocking handoff to the purchase pipeline.
    pub fn enqueue_purchase(&self, record: PurchaseRecord) {
        if self.purchases_tx.try_send(record).is_err() {
            error!("dropped purchase: queue full");
        }
    }
}

pub mod config;
pub mod error;

pub mod entities {
    pub mod prelude;

    pub mod checkout_attempts;
    pub mod purchases;
    pub mod sales;
}

pub mod services {
    pub mod checkout_code;
    pub mod item_catalog;
    pub mod redis_scripts;
    pub mod reservation_store;
    pub mod sale_cache;
    pub mod sale_store;
}

pub mod handlers;
pub mod jobs;
pub mod models;
