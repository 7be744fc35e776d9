//! Reservation store: the Redis-backed live state of the current sale.
//!
//! Owns the per-sale counters (stock, items sold), per-user checkout
//! counts, the active-sale pointer, and short-TTL checkout codes. Every
//! multi-key mutation runs as a server-side Lua script so concurrent
//! admissions serialize on the store, not in this process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError, RedisResult, Script};
use tracing::debug;

use crate::models::purchase::CodePayload;
use crate::services::redis_scripts::{
    AdmitOutcome, ADMIT_SCRIPT, INIT_SALE_SCRIPT, ROLLBACK_SCRIPT, TAKE_CODE_SCRIPT,
};

/// Items released per sale window
pub const INITIAL_STOCK: i64 = 10_000;
/// Reservations one user may hold within a single sale
pub const MAX_ITEMS_PER_USER: i64 = 10;
/// Lifetime of an unredeemed checkout code
pub const CODE_TTL_SECONDS: u64 = 20;

/// How long the active-sale pointer may be served from process memory
const ACTIVE_SALE_CACHE_TTL: Duration = Duration::from_secs(3600);

const ACTIVE_SALE_KEY: &str = "sale:current:active_sale";

#[derive(Debug, Clone, Copy)]
struct CachedSaleId {
    id: i32,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct ReservationStore {
    conn: ConnectionManager,
    admit_script: Script,
    rollback_script: Script,
    init_sale_script: Script,
    take_code_script: Script,
    active_sale: Arc<RwLock<Option<CachedSaleId>>>,
}

impl ReservationStore {
    /// Connect to the reservation store.
    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            admit_script: Script::new(ADMIT_SCRIPT),
            rollback_script: Script::new(ROLLBACK_SCRIPT),
            init_sale_script: Script::new(INIT_SALE_SCRIPT),
            take_code_script: Script::new(TAKE_CODE_SCRIPT),
            active_sale: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Active sale id, served from a 1-hour in-process cache.
    ///
    /// The cache is re-primed by `init_sale`, so within this process a
    /// rotation is visible immediately.
    pub async fn active_sale_id(&self) -> RedisResult<Option<i32>> {
        if let Some(cached) = *self.active_sale.read() {
            if cached.fetched_at.elapsed() < ACTIVE_SALE_CACHE_TTL {
                return Ok(Some(cached.id));
            }
        }

        let mut conn = self.conn.clone();
        let id: Option<i32> = conn.get(ACTIVE_SALE_KEY).await?;
        if let Some(id) = id {
            *self.active_sale.write() = Some(CachedSaleId {
                id,
                fetched_at: Instant::now(),
            });
        }
        Ok(id)
    }

    /// Atomic admission: checks stock, the per-user cap and the sale-wide
    /// cap, and applies all three counter mutations only if every check
    /// passes. The first failing check wins and mutates nothing.
    pub async fn admit(&self, sale_id: i32, user_id: &str) -> RedisResult<AdmitOutcome> {
        let mut conn = self.conn.clone();
        let reply: Vec<i64> = self
            .admit_script
            .key(stock_key(sale_id))
            .key(user_count_key(user_id))
            .key(items_sold_key(sale_id))
            .arg(user_id)
            .arg(MAX_ITEMS_PER_USER)
            .arg(INITIAL_STOCK)
            .invoke_async(&mut conn)
            .await?;

        let outcome = AdmitOutcome::from_reply(&reply).ok_or_else(|| {
            RedisError::from((
                ErrorKind::TypeError,
                "unexpected admission script reply shape",
            ))
        })?;

        debug!(
            user_id = %user_id,
            sale_id,
            stock_remaining = outcome.stock_remaining,
            user_count = outcome.user_count,
            items_sold = outcome.items_sold,
            status = outcome.status.as_str(),
            "admission evaluated"
        );
        Ok(outcome)
    }

    /// Inverse of `admit`, used when code persistence fails after a
    /// successful admission.
    pub async fn rollback(&self, sale_id: i32, user_id: &str) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        let reply: Vec<i64> = self
            .rollback_script
            .key(stock_key(sale_id))
            .key(user_count_key(user_id))
            .key(items_sold_key(sale_id))
            .arg(user_id)
            .invoke_async(&mut conn)
            .await?;

        debug!(user_id = %user_id, sale_id, ?reply, "admission rolled back");
        Ok(())
    }

    /// Restores the counters behind one expired admission. Same body as
    /// `rollback`. The expiry reconciler deliberately leaves counters
    /// consumed and never calls this; it exists for reconciliation flows
    /// that choose to return expired reservations to stock.
    pub async fn reap_expired(&self, sale_id: i32, user_id: &str) -> RedisResult<()> {
        self.rollback(sale_id, user_id).await
    }

    /// Atomically creates the per-sale counter keys (1-hour TTL) and moves
    /// the active-sale pointer. `items_sold` is nonzero only when
    /// restoring a mid-hour sale after a crash.
    pub async fn init_sale(
        &self,
        sale_id: i32,
        initial_stock: i64,
        items_sold: i64,
    ) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .init_sale_script
            .key(sale_id_key(sale_id))
            .key(stock_key(sale_id))
            .key(items_sold_key(sale_id))
            .key(started_at_key(sale_id))
            .key(ACTIVE_SALE_KEY)
            .arg(sale_id)
            .arg(initial_stock)
            .arg(items_sold)
            .arg(Utc::now().timestamp())
            .invoke_async(&mut conn)
            .await?;

        *self.active_sale.write() = Some(CachedSaleId {
            id: sale_id,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    /// Stores the payload behind a checkout code with the given TTL.
    pub async fn set_code(
        &self,
        code: &str,
        payload: &CodePayload,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let json = serde_json::to_string(payload).map_err(|e| {
            RedisError::from((
                ErrorKind::TypeError,
                "failed to serialize code payload",
                e.to_string(),
            ))
        })?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(code_key(code), json, ttl_seconds).await?;
        Ok(())
    }

    /// Reads a code without consuming it (used by the expiry reconciler).
    pub async fn get_code(&self, code: &str) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(code_key(code)).await
    }

    /// Atomically consumes a code. Exactly one of any number of concurrent
    /// callers gets the payload; the rest observe `None`.
    pub async fn take_code(&self, code: &str) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.take_code_script
            .key(code_key(code))
            .invoke_async(&mut conn)
            .await
    }

    /// Drops all per-user counters and live codes from the previous sale.
    /// Returns how many keys of each kind were removed.
    pub async fn rotate_cleanup(&self) -> RedisResult<(usize, usize)> {
        let mut conn = self.conn.clone();

        let user_keys: Vec<String> = conn.keys("sale:current:user:*:count").await?;
        if !user_keys.is_empty() {
            let _: () = conn.del(&user_keys).await?;
        }

        let code_keys: Vec<String> = conn.keys("checkout:*").await?;
        if !code_keys.is_empty() {
            let _: () = conn.del(&code_keys).await?;
        }

        Ok((user_keys.len(), code_keys.len()))
    }

    /// Remaining stock for a sale; `None` when the keys have expired.
    pub async fn stock_remaining(&self, sale_id: i32) -> RedisResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(stock_key(sale_id)).await
    }

    /// Items sold for a sale; `None` when the keys have expired.
    pub async fn items_sold(&self, sale_id: i32) -> RedisResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(items_sold_key(sale_id)).await
    }
}

fn sale_id_key(sale_id: i32) -> String {
    format!("sale:{sale_id}:id")
}

fn stock_key(sale_id: i32) -> String {
    format!("sale:{sale_id}:stock")
}

fn items_sold_key(sale_id: i32) -> String {
    format!("sale:{sale_id}:items_sold")
}

fn started_at_key(sale_id: i32) -> String {
    format!("sale:{sale_id}:started_at")
}

fn user_count_key(user_id: &str) -> String {
    format!("sale:current:user:{user_id}:count")
}

fn code_key(code: &str) -> String {
    format!("checkout:{code}")
}
