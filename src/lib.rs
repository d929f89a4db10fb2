//! Data-acquisition and state-fusion core for the indoor environment monitor.
//!
//! A [`Session`] seeds a sliding window of readings from the collector's
//! HTTP API, keeps a WebSocket alert stream open (reconnecting after a fixed
//! delay when it drops), classifies every inbound frame, and publishes a
//! [`SessionSnapshot`] after each change for whatever renders it.
//!
//! ```text
//!   HistoricalFetcher ──seed──▶ TimeSeriesBuffer ─┐
//!                                                 ├─▶ Session ──watch──▶ presentation
//!   StreamConnection ──classify──▶ AlertBuffer ───┘
//! ```
//!
//! This module is the gateway (EMBP): siblings import shared types from here
//! rather than from each other.

pub mod buffers;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod session;
pub mod stream;

pub use buffers::{AlertBuffer, TimeSeriesBuffer};
pub use classifier::{classify, Inbound};
pub use config::Config;
pub use error::{FetchError, FetchErrorKind};
pub use fetcher::HistoricalFetcher;
pub use models::{
    Alert, AlertNotice, Envelope, RawSensorReading, Reading, Severity, StreamFrame,
};
pub use session::{Session, SessionOptions, SessionSnapshot};
pub use stream::{
    ConnectionState, Connector, StreamConnection, StreamUpdate, TransportHandle, TransportSink,
    WebSocketConnector,
};
