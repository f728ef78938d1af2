//! Application configuration loaded from environment variables.

use std::time::Duration;

use coordinator::TxMode;
use coordinator::mode::UnknownTxMode;
use thiserror::Error;

/// Raised when the environment cannot be turned into a runnable
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is required")]
    MissingDatabaseUrl,

    #[error(transparent)]
    InvalidTxMode(#[from] UnknownTxMode),
}

/// Order-service configuration.
///
/// Reads from environment variables:
/// - `PORT` — listen port (default: `8080`)
/// - `DATABASE_URL` — PostgreSQL connection string (required)
/// - `DB_MAX_CONNECTIONS` — max database pool connections (default: `10`)
/// - `TX_MODE` — `twopc|tcc|saga-orch|saga-chor|outbox|none` (default: `twopc`)
/// - `REQUEST_TIMEOUT_MS` — participant call timeout (default: `2500`)
/// - `MOCK_2PC` — `0|1|true|false|yes|no` (default: `true`)
/// - `INVENTORY_BASE_URL` / `PAYMENT_BASE_URL` / `SHIPPING_BASE_URL` —
///   participant endpoints; empty skips the participant
/// - `KAFKA_BROKERS` — comma-separated; empty disables the relay
/// - `KAFKA_TOPIC` — outbox topic (default: `txlab.events`)
/// - `OUTBOX_POLL_MS` — relay poll interval (default: `500`)
/// - `OUTBOX_BATCH` — relay batch size (default: `100`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub tx_mode: TxMode,
    pub request_timeout: Duration,
    pub mock_two_pc: bool,
    pub inventory_base_url: String,
    pub payment_base_url: String,
    pub shipping_base_url: String,
    pub kafka_brokers: String,
    pub kafka_topic: String,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: i64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = getenv("DATABASE_URL", "");
        if database_url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(Self {
            port: getenv("PORT", "8080").parse().unwrap_or(8080),
            database_url,
            db_max_connections: getenv("DB_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
            tx_mode: getenv("TX_MODE", "twopc").parse()?,
            request_timeout: Duration::from_millis(
                getenv("REQUEST_TIMEOUT_MS", "2500").parse().unwrap_or(2500),
            ),
            mock_two_pc: parse_bool(&getenv("MOCK_2PC", "true")),
            inventory_base_url: base_url(&getenv("INVENTORY_BASE_URL", "")),
            payment_base_url: base_url(&getenv("PAYMENT_BASE_URL", "")),
            shipping_base_url: base_url(&getenv("SHIPPING_BASE_URL", "")),
            kafka_brokers: getenv("KAFKA_BROKERS", ""),
            kafka_topic: getenv("KAFKA_TOPIC", "txlab.events"),
            outbox_poll_interval: Duration::from_millis(
                getenv("OUTBOX_POLL_MS", "500").parse().unwrap_or(500),
            ),
            outbox_batch_size: getenv("OUTBOX_BATCH", "100").parse().unwrap_or(100),
        })
    }

    /// Returns the `"0.0.0.0:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn getenv(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_truthy_tokens() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        assert_eq!(base_url("http://inv:8081/"), "http://inv:8081");
        assert_eq!(base_url(""), "");
    }
}
