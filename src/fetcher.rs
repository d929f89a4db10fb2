//! One-shot reads against the collector's HTTP API.
//!
//! The collector serves readings newest first. Everything leaving this module
//! is oldest first, ready to seed the time-series window.

use std::{num::NonZeroU32, time::Duration};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{Envelope, FetchError, RawSensorReading, Reading};

// ---

/// HTTP client for historical and latest readings.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HistoricalFetcher {
    client: Client,
    api_base: String,
}

impl HistoricalFetcher {
    /// Build a fetcher for the collector at `api_base` with a per-request timeout.
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        // ---
        let client = Client::builder().timeout(timeout).build()?;
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch the most recent `limit` readings in ascending timestamp order.
    ///
    /// Performs exactly one request and never retries.
    pub async fn fetch_recent(&self, limit: NonZeroU32) -> Result<Vec<Reading>, FetchError> {
        // ---
        let url = format!("{}/api/sensor/readings", self.api_base);
        debug!("Fetching {} readings from {}", limit, url);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit.get())])
            .send()
            .await?;

        let envelope: Envelope<Vec<RawSensorReading>> = decode_envelope(response).await?;
        let Some(rows) = envelope.data else {
            return Err(FetchError::Malformed("response is missing 'data'".to_string()));
        };

        // Newest first on the wire; keep the newest `limit` and flip to oldest first.
        let mut readings: Vec<Reading> = rows
            .iter()
            .take(limit.get() as usize)
            .map(RawSensorReading::to_reading)
            .collect();
        readings.reverse();

        if !readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            warn!("Collector returned readings out of order, re-sorting by timestamp");
            readings.sort_by_key(|r| r.timestamp);
        }

        debug!("Fetched {} readings", readings.len());
        Ok(readings)
    }

    /// Fetch the single newest reading, or `None` if the collector has none yet.
    pub async fn fetch_latest(&self) -> Result<Option<Reading>, FetchError> {
        // ---
        let url = format!("{}/api/sensor/latest", self.api_base);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: Envelope<RawSensorReading> = decode_envelope(response).await?;
        Ok(envelope.data.as_ref().map(RawSensorReading::to_reading))
    }
}

/// Check the status code, decode the body and require `status == "success"`.
async fn decode_envelope<T>(response: reqwest::Response) -> Result<Envelope<T>, FetchError>
where
    T: DeserializeOwned,
{
    // ---
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if !envelope.is_success() {
        return Err(FetchError::Malformed(format!(
            "collector reported status '{}'",
            envelope.status
        )));
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        // ---
        let fetcher =
            HistoricalFetcher::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.api_base(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_request_error() {
        // ---
        // Port 9 (discard) on loopback is almost never listening.
        let fetcher =
            HistoricalFetcher::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch_recent(NonZeroU32::new(5).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::FetchErrorKind::Request);
    }
}
