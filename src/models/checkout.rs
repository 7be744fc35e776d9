//! Checkout request/response models
//!
//! Models for the POST /checkout endpoint that reserves one item and
//! returns a short-lived checkout code.

use serde::{Deserialize, Serialize};

/// Longest accepted user identifier (mirrors the column width)
pub const MAX_USER_ID_LEN: usize = 50;

/// Query parameters for the checkout endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutQuery {
    pub user_id: Option<String>,
    /// Item identifier, carried as a string but required to be a positive integer
    pub id: Option<String>,
}

impl CheckoutQuery {
    /// Validate the query and return `(user_id, item_id)`.
    ///
    /// Rejections here never touch the reservation store.
    pub fn validate(&self) -> Result<(String, String), String> {
        let user_id = match self.user_id.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Err("user_id and id are required".to_string()),
        };
        let item_id = match self.id.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => return Err("user_id and id are required".to_string()),
        };

        if user_id.len() > MAX_USER_ID_LEN {
            return Err("user_id is too long".to_string());
        }

        match item_id.parse::<i64>() {
            Ok(n) if n > 0 => {}
            _ => return Err("invalid item ID".to_string()),
        }

        Ok((user_id.to_string(), item_id.to_string()))
    }
}

/// Response for a successful checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(user_id: Option<&str>, id: Option<&str>) -> CheckoutQuery {
        CheckoutQuery {
            user_id: user_id.map(str::to_string),
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn test_valid_query() {
        let (user_id, item_id) = query(Some("u1"), Some("1")).validate().unwrap();
        assert_eq!(user_id, "u1");
        assert_eq!(item_id, "1");
    }

    #[test]
    fn test_missing_parameters_rejected() {
        assert!(query(None, Some("1")).validate().is_err());
        assert!(query(Some("u1"), None).validate().is_err());
        assert!(query(Some(""), Some("1")).validate().is_err());
        assert!(query(Some("u1"), Some("")).validate().is_err());
    }

    #[test]
    fn test_non_positive_item_id_rejected() {
        assert!(query(Some("u1"), Some("0")).validate().is_err());
        assert!(query(Some("u1"), Some("-3")).validate().is_err());
        assert!(query(Some("u1"), Some("abc")).validate().is_err());
        assert!(query(Some("u1"), Some("1.5")).validate().is_err());
    }

    #[test]
    fn test_user_id_length_cap() {
        let long_id = "u".repeat(MAX_USER_ID_LEN + 1);
        assert!(query(Some(&long_id), Some("1")).validate().is_err());

        let max_id = "u".repeat(MAX_USER_ID_LEN);
        assert!(query(Some(&max_id), Some("1")).validate().is_ok());
    }
}
