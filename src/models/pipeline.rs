//! Record types flowing through the background persistence queues.

use chrono::{DateTime, Utc};

/// Terminal status of a checkout attempt.
///
/// `Completed` is only ever reached by promotion: the purchase writer
/// upgrades a `Success` row once the matching purchase is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Success,
    OutOfStock,
    UserLimit,
    SaleLimit,
    Expired,
    Completed,
    Unknown,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Success => "success",
            AttemptStatus::OutOfStock => "out_of_stock",
            AttemptStatus::UserLimit => "user_limit",
            AttemptStatus::SaleLimit => "sale_limit",
            AttemptStatus::Expired => "expired",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Unknown => "unknown",
        }
    }
}

/// A checkout attempt bound for the checkout_attempts table
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub user_id: String,
    pub sale_id: i32,
    pub item_id: String,
    pub code: Option<String>,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
}

/// A redeemed purchase bound for the purchases table.
///
/// Carries the consumed code so the writer can promote the matching
/// attempt to `completed`; the code itself is not persisted here.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub user_id: String,
    pub sale_id: i32,
    pub item_id: String,
    pub code: String,
    pub purchased_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_are_snake_case() {
        let statuses = [
            AttemptStatus::Pending,
            AttemptStatus::Success,
            AttemptStatus::OutOfStock,
            AttemptStatus::UserLimit,
            AttemptStatus::SaleLimit,
            AttemptStatus::Expired,
            AttemptStatus::Completed,
            AttemptStatus::Unknown,
        ];
        for status in statuses {
            let s = status.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_status_strings_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for status in [
            AttemptStatus::Pending,
            AttemptStatus::Success,
            AttemptStatus::OutOfStock,
            AttemptStatus::UserLimit,
            AttemptStatus::SaleLimit,
            AttemptStatus::Expired,
            AttemptStatus::Completed,
            AttemptStatus::Unknown,
        ] {
            assert!(seen.insert(status.as_str()));
        }
    }
}
