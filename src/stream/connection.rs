use std::{fmt, future, pin::Pin, time::Duration};

use serde::Serialize;
use tokio::{
    sync::mpsc,
    time::{sleep, Sleep},
};
use tracing::{debug, info, warn};

use super::transport::{Connector, TransportEvent, TransportEventKind, TransportHandle, TransportSink};
use crate::{classify, Alert, Inbound, Reading};

// ---

/// Lifecycle state of a [`StreamConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Entered only through [`StreamConnection::shutdown`].
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Outcome of one handled stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// The connection moved to a new state.
    Status(ConnectionState),
    /// The transport failed; the connection is now `Disconnected`.
    Failed(String),
    /// A frame classified as an alert.
    Alert(Alert),
    /// A frame classified as a live reading.
    Reading(Reading),
    /// A frame that did not classify; nothing changed.
    Dropped,
    /// An event from a transport that is no longer current, or one that is
    /// not valid in the current state.
    Ignored,
}

enum Wake {
    Event(TransportEvent),
    Reconnect,
}

/// Owns the alert stream's lifecycle and its fixed-delay reconnect.
///
/// At any moment there is at most one open transport and at most one armed
/// reconnect timer, never both. Events are applied one at a time by
/// [`next_update`](Self::next_update).
pub struct StreamConnection<C> {
    connector: C,
    state: ConnectionState,
    reconnect_delay: Duration,
    transport: Option<TransportHandle>,
    reconnect: Option<Pin<Box<Sleep>>>,
    shutting_down: bool,
    generation: u64,
    last_error: Option<String>,
    next_alert_id: u64,
    dropped_frames: u64,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<C> fmt::Debug for StreamConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("transport_open", &self.transport.is_some())
            .field("reconnect_armed", &self.reconnect.is_some())
            .field("shutting_down", &self.shutting_down)
            .field("last_error", &self.last_error)
            .field("dropped_frames", &self.dropped_frames)
            .finish()
    }
}

impl<C: Connector> StreamConnection<C> {
    pub fn new(connector: C, reconnect_delay: Duration) -> Self {
        // ---
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            state: ConnectionState::Disconnected,
            reconnect_delay,
            transport: None,
            reconnect: None,
            shutting_down: false,
            generation: 0,
            last_error: None,
            next_alert_id: 1,
            dropped_frames: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Most recent transport error, cleared when a transport opens.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of inbound frames that failed classification.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn is_reconnect_armed(&self) -> bool {
        self.reconnect.is_some()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Open a new transport: `Disconnected | Closed → Connecting`.
    ///
    /// Does nothing while a transport is already open. An armed reconnect
    /// timer is cancelled since this start supersedes it.
    pub fn start(&mut self) {
        // ---
        if self.transport.is_some() {
            warn!("start() ignored: transport already open ({})", self.state);
            return;
        }
        self.reconnect = None;
        self.shutting_down = false;
        self.generation += 1;

        let sink = TransportSink::new(self.generation, self.events_tx.clone());
        self.transport = Some(self.connector.open(sink));
        self.state = ConnectionState::Connecting;
        debug!("Stream transport #{} opening", self.generation);
    }

    /// Close for good: any state `→ Closed`. Idempotent.
    pub fn shutdown(&mut self) {
        // ---
        // Flag first so a close event raised by closing the transport cannot re-arm.
        self.shutting_down = true;
        self.reconnect = None;
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        if self.state != ConnectionState::Closed {
            info!("Stream connection closed");
            self.state = ConnectionState::Closed;
        }
    }

    /// Wait for the next transport event or reconnect expiry and apply it.
    ///
    /// Pending forever while there is nothing left to happen (for example
    /// after shutdown), so it can sit in a `select!` alongside other work.
    pub async fn next_update(&mut self) -> StreamUpdate {
        // ---
        let reconnect = &mut self.reconnect;
        let timer = async {
            match reconnect.as_mut() {
                Some(sleep) => sleep.as_mut().await,
                None => future::pending().await,
            }
        };

        // The connection holds a sender itself, so `recv` never yields `None`.
        let wake = tokio::select! {
            Some(event) = self.events_rx.recv() => Wake::Event(event),
            _ = timer => Wake::Reconnect,
        };

        match wake {
            Wake::Event(event) => self.apply(event),
            Wake::Reconnect => self.reconnect_due(),
        }
    }

    /// Apply one transport event to the state machine.
    pub fn apply(&mut self, event: TransportEvent) -> StreamUpdate {
        // ---
        if self.shutting_down || event.generation != self.generation {
            debug!(
                "Ignoring stale event from transport #{} (current #{})",
                event.generation, self.generation
            );
            return StreamUpdate::Ignored;
        }

        match event.kind {
            TransportEventKind::Opened => {
                if self.state != ConnectionState::Connecting {
                    return StreamUpdate::Ignored;
                }
                info!("Stream transport #{} connected", self.generation);
                self.state = ConnectionState::Connected;
                self.last_error = None;
                StreamUpdate::Status(self.state)
            }
            TransportEventKind::Message(payload) => {
                if self.state != ConnectionState::Connected {
                    return StreamUpdate::Ignored;
                }
                match classify(&payload) {
                    Inbound::Alert(notice) => {
                        let id = self.next_alert_id;
                        self.next_alert_id += 1;
                        StreamUpdate::Alert(notice.into_alert(id))
                    }
                    Inbound::Reading(reading) => StreamUpdate::Reading(reading),
                    Inbound::Unknown(reason) => {
                        self.dropped_frames += 1;
                        debug!("Dropping unrecognized frame: {}", reason);
                        StreamUpdate::Dropped
                    }
                }
            }
            TransportEventKind::Unreadable(reason) => {
                if self.state != ConnectionState::Connected {
                    return StreamUpdate::Ignored;
                }
                self.dropped_frames += 1;
                debug!("Dropping unreadable frame: {}", reason);
                StreamUpdate::Dropped
            }
            TransportEventKind::Error(message) => self.lost(Some(message)),
            TransportEventKind::Closed => self.lost(None),
        }
    }

    /// Transport failed or closed: `Connecting | Connected → Disconnected`.
    fn lost(&mut self, error: Option<String>) -> StreamUpdate {
        // ---
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return StreamUpdate::Ignored;
        }

        self.transport = None;
        self.state = ConnectionState::Disconnected;

        if !self.shutting_down && self.reconnect.is_none() {
            debug!("Reconnecting in {:?}", self.reconnect_delay);
            self.reconnect = Some(Box::pin(sleep(self.reconnect_delay)));
        }

        match error {
            Some(message) => {
                warn!("Stream transport #{} failed: {}", self.generation, message);
                self.last_error = Some(message.clone());
                StreamUpdate::Failed(message)
            }
            None => {
                info!("Stream transport #{} closed", self.generation);
                StreamUpdate::Status(self.state)
            }
        }
    }

    fn reconnect_due(&mut self) -> StreamUpdate {
        // ---
        self.reconnect = None;
        if self.shutting_down {
            return StreamUpdate::Ignored;
        }
        info!("Reconnecting stream");
        self.start();
        StreamUpdate::Status(self.state)
    }
}
