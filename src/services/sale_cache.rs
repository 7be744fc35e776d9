//! In-process cache of sale metadata (item name and image URL).
//!
//! Written by the sale scheduler on rotation and by the purchase path on a
//! durable-store fallback; read on every redemption. Entries are never
//! evicted, the key space grows by one entry per hour.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleItem {
    pub item_name: String,
    pub image_url: String,
}

#[derive(Clone, Default)]
pub struct SaleCache {
    inner: Arc<RwLock<HashMap<i32, SaleItem>>>,
}

impl SaleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sale_id: i32) -> Option<SaleItem> {
        self.inner.read().get(&sale_id).cloned()
    }

    pub fn insert(&self, sale_id: i32, item: SaleItem) {
        self.inner.write().insert(sale_id, item);
    }
}
