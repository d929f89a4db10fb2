//! Error types for collector requests.

use thiserror::Error;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    HttpStatus,
    Malformed,
    Request,
}

/// Errors that can occur when reading from the collector's HTTP API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Collector answered with a non-success status code.
    #[error("collector returned HTTP {0}")]
    HttpStatus(u16),

    /// Body failed schema validation or reported an unsuccessful status.
    #[error("malformed collector response: {0}")]
    Malformed(String),

    /// Request never produced a response (connect failure, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::HttpStatus(_) => FetchErrorKind::HttpStatus,
            FetchError::Malformed(_) => FetchErrorKind::Malformed,
            FetchError::Request(_) => FetchErrorKind::Request,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}
