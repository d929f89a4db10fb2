//! Configuration loader for the `codemetal-envwatch` client.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every value has a default, so an empty environment
//! yields a client pointed at a collector on `localhost:8000`.
//!
use std::{env, time::Duration};

use anyhow::{anyhow, bail, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional millisecond environment variable into a [`Duration`].
macro_rules! parse_env_millis {
    ($var_name:expr, $default:expr) => {
        Duration::from_millis(
            env::var($var_name)
                .ok()
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
                .unwrap_or($default),
        )
    };
}

/// Read an optional string environment variable, trimming a trailing `/`.
macro_rules! env_url_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| $default.to_string())
    };
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8000";
pub const DEFAULT_HISTORY_LIMIT: u32 = 30;
pub const DEFAULT_MAX_ALERTS: u32 = 3;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// The collector serves at most this many readings per request.
pub const MAX_HISTORY_LIMIT: u32 = 1_000;
pub const MAX_ALERTS_LIMIT: u32 = 100;

/// Strongly typed client configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // ---
    /// Collector HTTP base URL (historical and latest readings).
    pub api_base_url: String,

    /// Collector streaming base URL (alert WebSocket).
    pub ws_base_url: String,

    /// Number of historical readings to fetch; also the window capacity.
    pub history_limit: u32,

    /// Maximum number of alerts kept for display.
    pub max_alerts: u32,

    /// Fixed wait before a dropped stream is reopened.
    pub reconnect_delay: Duration,

    /// Interval between latest-reading polls. Zero disables polling.
    pub poll_interval: Duration,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_alerts: DEFAULT_MAX_ALERTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `API_BASE_URL` – collector HTTP base (default: `http://localhost:8000`)
/// - `WS_BASE_URL` – collector streaming base (default: `ws://localhost:8000`)
/// - `HISTORY_LIMIT` – readings to fetch and keep (default: 30, 1..=1000)
/// - `MAX_ALERTS` – alerts to keep (default: 3, 1..=100)
/// - `RECONNECT_DELAY_MS` – fixed reconnect delay (default: 5000)
/// - `POLL_INTERVAL_MS` – latest-reading poll interval (default: 5000, 0 = off)
/// - `REQUEST_TIMEOUT_MS` – HTTP request timeout (default: 10000)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let api_base_url = env_url_or!("API_BASE_URL", DEFAULT_API_BASE_URL);
    let ws_base_url = env_url_or!("WS_BASE_URL", DEFAULT_WS_BASE_URL);
    let history_limit = parse_env_u32!("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT);
    let max_alerts = parse_env_u32!("MAX_ALERTS", DEFAULT_MAX_ALERTS);
    let reconnect_delay = parse_env_millis!("RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS);
    let poll_interval = parse_env_millis!("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
    let request_timeout = parse_env_millis!("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS);

    let cfg = Config {
        api_base_url,
        ws_base_url,
        history_limit,
        max_alerts,
        reconnect_delay,
        poll_interval,
        request_timeout,
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values the buffers and fetcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        // ---
        if !(1..=MAX_HISTORY_LIMIT).contains(&self.history_limit) {
            bail!(
                "HISTORY_LIMIT must be between 1 and {}, got {}",
                MAX_HISTORY_LIMIT,
                self.history_limit
            );
        }
        if !(1..=MAX_ALERTS_LIMIT).contains(&self.max_alerts) {
            bail!(
                "MAX_ALERTS must be between 1 and {}, got {}",
                MAX_ALERTS_LIMIT,
                self.max_alerts
            );
        }
        if self.request_timeout.is_zero() {
            bail!("REQUEST_TIMEOUT_MS must be greater than 0");
        }
        Ok(())
    }

    /// Full URL of the alert stream endpoint.
    pub fn alerts_ws_url(&self) -> String {
        format!("{}/ws/alerts", self.ws_base_url)
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  API_BASE_URL       : {}", self.api_base_url);
        tracing::info!("  WS_BASE_URL        : {}", self.ws_base_url);
        tracing::info!("  HISTORY_LIMIT      : {}", self.history_limit);
        tracing::info!("  MAX_ALERTS         : {}", self.max_alerts);
        tracing::info!("  RECONNECT_DELAY_MS : {}", self.reconnect_delay.as_millis());
        tracing::info!("  POLL_INTERVAL_MS   : {}", self.poll_interval.as_millis());
        tracing::info!("  REQUEST_TIMEOUT_MS : {}", self.request_timeout.as_millis());
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        // ---
        let cfg = Config::default();
        assert_eq!(cfg.api_base_url, "http://localhost:8000");
        assert_eq!(cfg.ws_base_url, "ws://localhost:8000");
        assert_eq!(cfg.history_limit, 30);
        assert_eq!(cfg.max_alerts, 3);
        assert_eq!(cfg.reconnect_delay, Duration::from_millis(5000));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_alerts_ws_url() {
        // ---
        let cfg = Config {
            ws_base_url: "ws://collector:9000".to_string(),
            ..Config::default()
        };
        assert_eq!(cfg.alerts_ws_url(), "ws://collector:9000/ws/alerts");
    }

    #[test]
    fn test_zero_limits_rejected() {
        // ---
        let no_history = Config {
            history_limit: 0,
            ..Config::default()
        };
        assert!(no_history.validate().is_err());

        let no_alerts = Config {
            max_alerts: 0,
            ..Config::default()
        };
        assert!(no_alerts.validate().is_err());
    }

    #[test]
    fn test_oversized_limits_rejected() {
        // ---
        let huge_alerts = Config {
            max_alerts: u32::MAX,
            ..Config::default()
        };
        assert!(huge_alerts.validate().is_err());

        let huge_history = Config {
            history_limit: MAX_HISTORY_LIMIT + 1,
            ..Config::default()
        };
        assert!(huge_history.validate().is_err());

        let at_bounds = Config {
            history_limit: MAX_HISTORY_LIMIT,
            max_alerts: MAX_ALERTS_LIMIT,
            ..Config::default()
        };
        assert!(at_bounds.validate().is_ok());
    }
}
