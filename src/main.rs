//! Application entry point for the `codemetal-envwatch` client.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Starting a session against the configured collector
//! - Logging every published snapshot until Ctrl-C, then shutting down
//!
//! # Environment Variables
//! - `API_BASE_URL`, `WS_BASE_URL`, `HISTORY_LIMIT`, `MAX_ALERTS`,
//!   `RECONNECT_DELAY_MS`, `POLL_INTERVAL_MS`, `REQUEST_TIMEOUT_MS` – see `config`
//! - `ENVWATCH_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `ENVWATCH_SPAN_EVENTS` (optional) – span event mode for tracing
use std::env;

use anyhow::Result;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use envwatch::{
    config, HistoricalFetcher, Session, SessionOptions, SessionSnapshot, WebSocketConnector,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let fetcher = HistoricalFetcher::new(cfg.api_base_url.clone(), cfg.request_timeout)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
    let connector = WebSocketConnector::new(cfg.alerts_ws_url());

    let mut session = Session::start(SessionOptions::from_config(&cfg), fetcher, connector);
    let mut updates = session.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                report(&snapshot);
            }
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Log one snapshot the way a dashboard header and alert strip would show it.
fn report(snapshot: &SessionSnapshot) {
    // ---
    let latest = snapshot
        .latest()
        .map(|r| format!("{:.1}°C / {:.1}%", r.temperature, r.humidity))
        .unwrap_or_else(|| "no data".to_string());

    tracing::info!(
        status = %snapshot.connection_status,
        loading = snapshot.is_loading,
        readings = snapshot.readings.len(),
        alerts = snapshot.alerts.len(),
        "current {}",
        latest
    );
    if let Some(err) = &snapshot.last_error {
        tracing::warn!("last error: {}", err);
    }
    for alert in &snapshot.alerts {
        tracing::info!(
            "  [{:?}] #{} {} ({})",
            alert.severity,
            alert.id,
            alert.message,
            alert.timestamp.format("%H:%M:%S")
        );
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `ENVWATCH_LOG_LEVEL` picks the level
/// and the socket/TLS crates are held at `warn`. `ENVWATCH_SPAN_EVENTS=full`
/// or `enter_exit` widens span reporting, and `FORCE_COLOR` overrides TTY
/// detection.
fn init_tracing() {
    // ---
    let span_events = match env::var("ENVWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(format!(
            "{},hyper_util=warn,tungstenite=warn,rustls=warn",
            log_level()
        )),
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

/// Level named by `ENVWATCH_LOG_LEVEL`, or `info` when unset or unknown.
fn log_level() -> &'static str {
    let requested = env::var("ENVWATCH_LOG_LEVEL").unwrap_or_default();
    ["trace", "debug", "info", "warn", "error"]
        .into_iter()
        .find(|level| requested.eq_ignore_ascii_case(level))
        .unwrap_or("info")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_log_level_from_env() {
        // ---
        env::set_var("ENVWATCH_LOG_LEVEL", "DEBUG");
        assert_eq!(log_level(), "debug");

        env::set_var("ENVWATCH_LOG_LEVEL", "verbose");
        assert_eq!(log_level(), "info");

        env::remove_var("ENVWATCH_LOG_LEVEL");
        assert_eq!(log_level(), "info");
    }
}
