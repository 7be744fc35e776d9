use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;

use flashsale_backend::services::reservation_store::ReservationStore;

/// Set up test database connection
/// Uses TEST_POSTGRES_URL environment variable or falls back to default
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("TEST_POSTGRES_URL")
        .unwrap_or_else(|_| "postgres://localhost:5432/flash_sale_test".to_string());

    Database::connect(&database_url).await
}

/// Set up test reservation store
/// Uses TEST_REDIS_URL environment variable or falls back to default
#[allow(dead_code)]
pub async fn setup_test_store() -> ReservationStore {
    let redis_url =
        env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    ReservationStore::connect(&redis_url)
        .await
        .expect("Failed to connect to test Redis")
}

/// Sale ids used by tests are large negatives so they never collide with
/// real sales created by a scheduler running against the same store.
#[allow(dead_code)]
pub fn unique_test_sale_id() -> i32 {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static OFFSET: AtomicI32 = AtomicI32::new(0);
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i32)
        .unwrap_or(0);
    -(seconds % 1_000_000_000) - OFFSET.fetch_add(1, Ordering::Relaxed)
}
