//! Checkout handler: the admission path of the flash sale.
//!
//! POST /checkout?user_id=<id>&id=<item> reserves one item and returns a
//! short-lived checkout code. The three coupled caps (stock, per-user,
//! sale-wide) are enforced by a single atomic script in the reservation
//! store; this handler never retries against it.
//!
//! Every admitted request is recorded through the attempt queue in its
//! terminal status. The send is non-blocking: a full queue drops the
//! record rather than back-pressuring the reservation path.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::models::checkout::{CheckoutQuery, CheckoutResponse};
use crate::models::pipeline::{AttemptRecord, AttemptStatus};
use crate::models::purchase::CodePayload;
use crate::services::checkout_code;
use crate::services::redis_scripts::AdmitStatus;
use crate::services::reservation_store::CODE_TTL_SECONDS;
use crate::AppState;

/// POST /checkout
///
/// # Responses
/// - 201: reservation admitted, body carries the checkout code
/// - 400: missing/invalid parameters, or no sale is active
/// - 409: stock or sale-wide cap exhausted
/// - 429: per-user cap exhausted
/// - 500: reservation store failure
pub async fn checkout(
    State(state): State<AppState>,
    Query(query): Query<CheckoutQuery>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    // Rejections here have not touched any counter and are not recorded.
    let (user_id, item_id) = query.validate().map_err(ApiError::BadRequest)?;

    let sale_id = match state.reservations.active_sale_id().await {
        Ok(Some(id)) => id,
        Ok(None) => {
            info!(user_id = %user_id, "checkout rejected: no sale is active");
            return Err(ApiError::NoActiveSale);
        }
        Err(e) => {
            error!(error = %e, "failed to resolve active sale");
            return Err(ApiError::Internal);
        }
    };

    let mut attempt = AttemptRecord {
        user_id: user_id.clone(),
        sale_id,
        item_id: item_id.clone(),
        code: None,
        status: AttemptStatus::Pending,
        created_at: Utc::now(),
    };

    let outcome = match state.reservations.admit(sale_id, &user_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, user_id = %user_id, "admission script failed");
            return Err(ApiError::Internal);
        }
    };

    match outcome.status {
        AdmitStatus::Success => {}
        AdmitStatus::OutOfStock => {
            attempt.status = AttemptStatus::OutOfStock;
            state.enqueue_attempt(attempt);
            info!(
                user_id = %user_id,
                stock_remaining = outcome.stock_remaining,
                "checkout rejected: out of stock"
            );
            return Err(ApiError::SoldOut);
        }
        AdmitStatus::UserLimit => {
            attempt.status = AttemptStatus::UserLimit;
            state.enqueue_attempt(attempt);
            info!(
                user_id = %user_id,
                user_count = outcome.user_count,
                "checkout rejected: user limit reached"
            );
            return Err(ApiError::UserLimit);
        }
        AdmitStatus::SaleLimit => {
            attempt.status = AttemptStatus::SaleLimit;
            state.enqueue_attempt(attempt);
            info!(
                user_id = %user_id,
                items_sold = outcome.items_sold,
                "checkout rejected: sale limit reached"
            );
            return Err(ApiError::SoldOut);
        }
        AdmitStatus::Unknown => {
            attempt.status = AttemptStatus::Unknown;
            state.enqueue_attempt(attempt);
            error!(user_id = %user_id, "admission returned unknown status");
            return Err(ApiError::Internal);
        }
    }

    let code = checkout_code::generate_code();
    let payload = CodePayload {
        user_id: user_id.clone(),
        sale_id: sale_id.to_string(),
        item_id: item_id.clone(),
        created_at: Utc::now().to_rfc3339(),
    };

    if let Err(e) = state
        .reservations
        .set_code(&code, &payload, CODE_TTL_SECONDS)
        .await
    {
        error!(error = %e, user_id = %user_id, "failed to store checkout code");

        // The admission already counted; undo it so the slot is not lost.
        if let Err(rollback_err) = state.reservations.rollback(sale_id, &user_id).await {
            error!(error = %rollback_err, user_id = %user_id, "failed to roll back admission");
        }

        attempt.status = AttemptStatus::Unknown;
        state.enqueue_attempt(attempt);
        return Err(ApiError::Internal);
    }

    attempt.status = AttemptStatus::Success;
    attempt.code = Some(code.clone());
    state.enqueue_attempt(attempt);

    info!(
        user_id = %user_id,
        sale_id,
        stock_remaining = outcome.stock_remaining,
        user_count = outcome.user_count,
        items_sold = outcome.items_sold,
        "checkout succeeded"
    );

    Ok((StatusCode::CREATED, Json(CheckoutResponse { code })))
}
