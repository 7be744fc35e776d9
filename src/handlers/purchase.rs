//! Purchase handler: the redemption path of the flash sale.
//!
//! POST /purchase?code=<code> consumes a checkout code and records the
//! purchase. Redemption never touches the sale counters: the admission
//! already counted the item, and an unredeemed admission stays counted.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::models::pipeline::PurchaseRecord;
use crate::models::purchase::{CodePayload, PurchaseQuery, PurchaseResponse};
use crate::services::sale_cache::SaleItem;
use crate::services::sale_store;
use crate::AppState;

/// Opaque token attached to 1 in 100 purchases
const LUCKY_METADATA: &str = "b64 eW91IGZvdW5kIHRoZSBoaWRkZW4gZHJvcA==";

/// POST /purchase
///
/// # Responses
/// - 200: code redeemed, body carries the item metadata
/// - 400: missing code parameter
/// - 404: unknown, expired, or already redeemed code
/// - 500: store failure
pub async fn purchase(
    State(state): State<AppState>,
    Query(query): Query<PurchaseQuery>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let code = match query.code.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => return Err(ApiError::BadRequest("code is required".to_string())),
    };

    // Exactly one concurrent redeemer of the same code gets the payload.
    let raw_payload = match state.reservations.take_code(&code).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            info!(code = %code, "invalid or expired code");
            return Err(ApiError::InvalidCode);
        }
        Err(e) => {
            error!(error = %e, code = %code, "failed to consume checkout code");
            return Err(ApiError::Internal);
        }
    };

    let payload: CodePayload = serde_json::from_str(&raw_payload).map_err(|e| {
        error!(error = %e, code = %code, "malformed code payload");
        ApiError::Internal
    })?;
    let sale_id = payload.sale_id().map_err(|e| {
        error!(error = %e, code = %code, "malformed sale id in code payload");
        ApiError::Internal
    })?;

    let item = match state.sale_cache.get(sale_id) {
        Some(item) => item,
        None => {
            warn!(sale_id, "sale metadata missing from cache, falling back to database");
            match sale_store::sale_by_id(&state.db, sale_id).await {
                Ok(Some(sale)) => {
                    let item = SaleItem {
                        item_name: sale.item_name,
                        image_url: sale.image_url,
                    };
                    state.sale_cache.insert(sale_id, item.clone());
                    item
                }
                Ok(None) => {
                    error!(sale_id, "sale missing from durable store");
                    return Err(ApiError::Internal);
                }
                Err(e) => {
                    error!(error = %e, sale_id, "failed to load sale metadata");
                    return Err(ApiError::Internal);
                }
            }
        }
    };

    state.enqueue_purchase(PurchaseRecord {
        user_id: payload.user_id.clone(),
        sale_id,
        item_id: payload.item_id.clone(),
        code,
        purchased_at: Utc::now(),
    });

    info!(
        user_id = %payload.user_id,
        sale_id,
        item_id = %payload.item_id,
        "purchase completed"
    );

    let metadata = if rand::thread_rng().gen_range(0..100) < 1 {
        LUCKY_METADATA.to_string()
    } else {
        String::new()
    };

    Ok(Json(PurchaseResponse {
        status: "success".to_string(),
        item_id: payload.item_id,
        item_name: item.item_name,
        image_url: item.image_url,
        metadata,
    }))
}
