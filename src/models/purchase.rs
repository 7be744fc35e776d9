//! Purchase request/response models
//!
//! Models for the POST /purchase endpoint that redeems a checkout code,
//! plus the payload stored behind each code in the reservation store.

use serde::{Deserialize, Serialize};

/// Query parameters for the purchase endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseQuery {
    pub code: Option<String>,
}

/// Response for a successful purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub status: String,
    pub item_id: String,
    pub item_name: String,
    pub image_url: String,
    /// Usually empty; 1 in 100 purchases carry an opaque token
    pub metadata: String,
}

/// Payload stored behind a checkout code in the reservation store.
///
/// All fields are strings so the stored JSON stays schema-free; `sale_id`
/// is parsed back on redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePayload {
    pub user_id: String,
    pub sale_id: String,
    pub item_id: String,
    /// RFC3339 timestamp of the admission
    pub created_at: String,
}

impl CodePayload {
    pub fn sale_id(&self) -> Result<i32, std::num::ParseIntError> {
        self.sale_id.parse()
    }
}
