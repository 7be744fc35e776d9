//! Lua scripts for atomic reservation-store operations.
//!
//! The three admission invariants (stock, per-user cap, sale-wide cap)
//! cannot be preserved by a sequence of individual commands; every
//! multi-key mutation here executes server-side as one atomic unit.

/// Performs all admission checks and counter updates atomically.
///
/// KEYS: [1] stock_key, [2] user_count_key, [3] items_sold_key
/// ARGV: [1] user_id, [2] max_items_per_user, [3] max_total_items
/// Returns: [stock_remaining, user_count, items_sold, status_code]
/// Status codes: 0=success, 1=out_of_stock, 2=user_limit, 3=sale_limit
pub const ADMIT_SCRIPT: &str = r#"
    local stock_key = KEYS[1]
    local user_count_key = KEYS[2]
    local items_sold_key = KEYS[3]

    local max_user_items = tonumber(ARGV[2])
    local max_total_items = tonumber(ARGV[3])

    local current_stock = tonumber(redis.call('GET', stock_key) or 0)
    local current_user_count = tonumber(redis.call('GET', user_count_key) or 0)
    local current_items_sold = tonumber(redis.call('GET', items_sold_key) or 0)

    if current_stock <= 0 then
        return {current_stock, current_user_count, current_items_sold, 1}
    end

    if current_user_count >= max_user_items then
        return {current_stock, current_user_count, current_items_sold, 2}
    end

    if current_items_sold >= max_total_items then
        return {current_stock, current_user_count, current_items_sold, 3}
    end

    local new_stock = redis.call('DECR', stock_key)
    local new_user_count = redis.call('INCR', user_count_key)
    local new_items_sold = redis.call('INCR', items_sold_key)

    return {new_stock, new_user_count, new_items_sold, 0}
"#;

/// Rolls back one admission atomically; user and sold counters clamp at
/// zero, stock deliberately has no clamp.
///
/// KEYS: [1] stock_key, [2] user_count_key, [3] items_sold_key
/// Returns: [new_stock, new_user_count, new_items_sold]
pub const ROLLBACK_SCRIPT: &str = r#"
    local stock_key = KEYS[1]
    local user_count_key = KEYS[2]
    local items_sold_key = KEYS[3]

    local new_stock = redis.call('INCR', stock_key)
    local new_user_count = redis.call('DECR', user_count_key)
    local new_items_sold = redis.call('DECR', items_sold_key)

    if new_user_count < 0 then
        redis.call('SET', user_count_key, 0)
        new_user_count = 0
    end

    if new_items_sold < 0 then
        redis.call('SET', items_sold_key, 0)
        new_items_sold = 0
    end

    return {new_stock, new_user_count, new_items_sold}
"#;

/// Initializes all counters for a sale and moves the active pointer, as
/// one atomic unit. Per-sale keys carry a 1-hour TTL; the pointer has none.
///
/// KEYS: [1] sale_id_key, [2] stock_key, [3] items_sold_key,
///       [4] started_at_key, [5] active_sale_key
/// ARGV: [1] sale_id, [2] initial_stock, [3] items_sold, [4] started_at
/// Returns: "OK"
pub const INIT_SALE_SCRIPT: &str = r#"
    local sale_id_key = KEYS[1]
    local stock_key = KEYS[2]
    local items_sold_key = KEYS[3]
    local started_at_key = KEYS[4]
    local active_sale_key = KEYS[5]

    local sale_id = ARGV[1]
    local initial_stock = tonumber(ARGV[2])
    local items_sold = tonumber(ARGV[3])
    local started_at = ARGV[4]

    redis.call('SETEX', sale_id_key, 3600, sale_id)
    redis.call('SETEX', stock_key, 3600, initial_stock)
    redis.call('SETEX', items_sold_key, 3600, items_sold)
    redis.call('SETEX', started_at_key, 3600, started_at)
    redis.call('SET', active_sale_key, sale_id)

    return 'OK'
"#;

/// Reads and deletes a checkout code as one atomic unit, so exactly one
/// of any number of concurrent redeemers observes the payload.
///
/// KEYS: [1] code_key
/// Returns: payload or nil
pub const TAKE_CODE_SCRIPT: &str = r#"
    local payload = redis.call('GET', KEYS[1])
    if not payload then
        return nil
    end
    redis.call('DEL', KEYS[1])
    return payload
"#;

/// Outcome status of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitStatus {
    Success,
    OutOfStock,
    UserLimit,
    SaleLimit,
    Unknown,
}

impl AdmitStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => AdmitStatus::Success,
            1 => AdmitStatus::OutOfStock,
            2 => AdmitStatus::UserLimit,
            3 => AdmitStatus::SaleLimit,
            _ => AdmitStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmitStatus::Success => "success",
            AdmitStatus::OutOfStock => "out_of_stock",
            AdmitStatus::UserLimit => "user_limit",
            AdmitStatus::SaleLimit => "sale_limit",
            AdmitStatus::Unknown => "unknown",
        }
    }
}

/// Result of the atomic admission script
#[derive(Debug, Clone, Copy)]
pub struct AdmitOutcome {
    pub stock_remaining: i64,
    pub user_count: i64,
    pub items_sold: i64,
    pub status: AdmitStatus,
}

impl AdmitOutcome {
    /// Parse the `[stock, user_count, items_sold, status]` script reply.
    pub fn from_reply(reply: &[i64]) -> Option<Self> {
        match reply {
            [stock_remaining, user_count, items_sold, status] => Some(Self {
                stock_remaining: *stock_remaining,
                user_count: *user_count,
                items_sold: *items_sold,
                status: AdmitStatus::from_code(*status),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(AdmitStatus::from_code(0), AdmitStatus::Success);
        assert_eq!(AdmitStatus::from_code(1), AdmitStatus::OutOfStock);
        assert_eq!(AdmitStatus::from_code(2), AdmitStatus::UserLimit);
        assert_eq!(AdmitStatus::from_code(3), AdmitStatus::SaleLimit);
        assert_eq!(AdmitStatus::from_code(99), AdmitStatus::Unknown);
    }

    #[test]
    fn test_outcome_from_valid_reply() {
        let outcome = AdmitOutcome::from_reply(&[9_999, 1, 1, 0]).unwrap();
        assert_eq!(outcome.stock_remaining, 9_999);
        assert_eq!(outcome.user_count, 1);
        assert_eq!(outcome.items_sold, 1);
        assert_eq!(outcome.status, AdmitStatus::Success);
    }

    #[test]
    fn test_outcome_from_malformed_reply() {
        assert!(AdmitOutcome::from_reply(&[]).is_none());
        assert!(AdmitOutcome::from_reply(&[1, 2, 3]).is_none());
        assert!(AdmitOutcome::from_reply(&[1, 2, 3, 0, 5]).is_none());
    }

    #[test]
    fn test_rejection_reply_keeps_current_values() {
        let outcome = AdmitOutcome::from_reply(&[0, 4, 10_000, 1]).unwrap();
        assert_eq!(outcome.status, AdmitStatus::OutOfStock);
        assert_eq!(outcome.stock_remaining, 0);
        assert_eq!(outcome.user_count, 4);
    }
}
