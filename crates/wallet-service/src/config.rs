//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::ledger::LedgerOptions;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "./data/wallet").
    pub data_dir: String,

    /// Shared secret every request must carry in its `token` field.
    pub shared_token: String,

    /// Seconds between background flushes (default: 10).
    pub flush_interval_seconds: u64,

    /// Flush once more when shutting down (default: true).
    pub flush_on_shutdown: bool,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables take their default. Values that fail to parse are
    /// logged and also fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            shared_token: std::env::var("SHARED_TOKEN").unwrap_or(defaults.shared_token),
            flush_interval_seconds: parse_env(
                "FLUSH_INTERVAL_SECONDS",
                defaults.flush_interval_seconds,
            ),
            flush_on_shutdown: parse_env("FLUSH_ON_SHUTDOWN", defaults.flush_on_shutdown),
            max_body_bytes: parse_env("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: parse_env(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// Period of the background flush. Never zero.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_seconds.max(1))
    }

    /// Options for starting the ledger.
    #[must_use]
    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            flush_interval: self.flush_interval(),
            flush_on_shutdown: self.flush_on_shutdown,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    parse_or(name, &raw, default)
}

fn parse_or<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(variable = %name, value = %raw, ?default, "Invalid value, using default");
        default
    })
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "./data/wallet".into(),
            shared_token: "testtask".into(),
            flush_interval_seconds: 10,
            flush_on_shutdown: true,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
