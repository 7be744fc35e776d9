//! Environment configuration
//!
//! Every knob has a default so the service boots against a local
//! Redis/Postgres with no environment at all.

use std::env;

/// Default capacity of each persistence queue (~10 MB of records)
const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub redis_url: String,
    pub postgres_url: String,
    pub attempt_queue_capacity: usize,
    pub purchase_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            postgres_url: env::var("POSTGRES_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/flash_sale".to_string()),
            attempt_queue_capacity: env::var("ATTEMPT_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            purchase_queue_capacity: env::var("PURCHASE_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queue_capacity() {
        assert_eq!(DEFAULT_QUEUE_CAPACITY, 100_000);
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = Config {
            port: 8080,
            log_level: "info".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            postgres_url: "postgres://localhost:5432/flash_sale".to_string(),
            attempt_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            purchase_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        };
        let cloned = config.clone();
        assert_eq!(cloned.port, 8080);
        assert_eq!(cloned.log_level, "info");
    }
}
