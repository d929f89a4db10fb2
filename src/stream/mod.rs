//! Persistent alert stream with fixed-delay reconnect.
//!
//! [`StreamConnection`] is the state machine; [`Connector`] is the seam to the
//! actual transport, with [`WebSocketConnector`] as the production one.

mod connection;
mod transport;
mod websocket;

pub use connection::{ConnectionState, StreamConnection, StreamUpdate};
pub use transport::{
    CloseSignal, Connector, TransportEvent, TransportEventKind, TransportHandle, TransportSink,
};
pub use websocket::WebSocketConnector;
