//! Health handler
//!
//! GET /health reports dependency health, the live sale counters, and the
//! persistence queue depths. Any unhealthy dependency degrades the
//! overall status to 503.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use std::collections::HashMap;

use crate::models::health::{HealthStatus, PerformanceStats, QueueCapacity, SaleInfo};
use crate::services::sale_store;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let mut services = HashMap::new();
    services.insert(
        "redis".to_string(),
        match state.reservations.ping().await {
            Ok(()) => "healthy".to_string(),
            Err(e) => format!("unhealthy: {e}"),
        },
    );
    services.insert(
        "postgres".to_string(),
        match state.db.ping().await {
            Ok(()) => "healthy".to_string(),
            Err(e) => format!("unhealthy: {e}"),
        },
    );

    let degraded = services.values().any(|s| s != "healthy");
    let status = if degraded { "degraded" } else { "healthy" };

    let health = HealthStatus {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        services,
        sale: current_sale_info(&state).await,
        performance: performance_stats(&state),
    };

    let status_code = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(health))
}

async fn current_sale_info(state: &AppState) -> SaleInfo {
    let mut info = SaleInfo::default();

    let sale_id = match state.reservations.active_sale_id().await {
        Ok(Some(id)) => id,
        _ => return info,
    };
    info.id = sale_id;
    info.is_active = true;

    if let Ok(Some(stock)) = state.reservations.stock_remaining(sale_id).await {
        info.stock = stock;
    }
    if let Ok(Some(sold)) = state.reservations.items_sold(sale_id).await {
        info.sold = sold;
    }

    match state.sale_cache.get(sale_id) {
        Some(item) => {
            info.item_name = Some(item.item_name);
            info.image_url = Some(item.image_url);
        }
        None => {
            if let Ok(Some(sale)) = sale_store::sale_by_id(&state.db, sale_id).await {
                info.item_name = Some(sale.item_name);
                info.image_url = Some(sale.image_url);
            }
        }
    }

    info
}

fn performance_stats(state: &AppState) -> PerformanceStats {
    let attempts_max = state.attempts_tx.max_capacity();
    let purchases_max = state.purchases_tx.max_capacity();
    PerformanceStats {
        attempt_queue_size: attempts_max - state.attempts_tx.capacity(),
        purchase_queue_size: purchases_max - state.purchases_tx.capacity(),
        queue_capacity: QueueCapacity {
            attempts_max,
            purchases_max,
        },
    }
}
