//! Health endpoint response models

use serde::Serialize;
use std::collections::HashMap;

/// System health and statistics returned by GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "degraded"
    pub status: String,
    pub timestamp: String,
    /// Per-dependency health ("redis", "postgres")
    pub services: HashMap<String, String>,
    pub sale: SaleInfo,
    pub performance: PerformanceStats,
}

/// Current sale information
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaleInfo {
    pub id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "stock_remaining")]
    pub stock: i64,
    #[serde(rename = "items_sold")]
    pub sold: i64,
    pub is_active: bool,
}

/// Persistence queue depth and capacity
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub attempt_queue_size: usize,
    pub purchase_queue_size: usize,
    pub queue_capacity: QueueCapacity,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueCapacity {
    pub attempts_max: usize,
    pub purchases_max: usize,
}
