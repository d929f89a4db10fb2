//! Transport seam between [`StreamConnection`](super::StreamConnection) and
//! whatever actually carries the frames.
//!
//! A [`Connector`] opens one transport per call. The transport reports what
//! happens to it through a [`TransportSink`] and is told to go away through
//! its [`CloseSignal`]. The state machine never touches the network itself,
//! which is what lets it run against a scripted connector in tests.

use std::fmt::Display;

use tokio::sync::{mpsc, oneshot};

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    Message(String),
    /// A frame arrived but could not be read as text.
    Unreadable(String),
    Error(String),
    Closed,
}

/// A transport event tagged with the generation of the transport that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: TransportEventKind,
}

/// Event reporter handed to a transport when it is opened.
///
/// Reports after the owning connection has moved on are discarded by the
/// connection, so a transport never has to check whether it is still wanted.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportSink {
    pub(crate) fn new(generation: u64, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { generation, events }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened(&self) {
        self.send(TransportEventKind::Opened);
    }

    pub fn message(&self, payload: impl Into<String>) {
        self.send(TransportEventKind::Message(payload.into()));
    }

    pub fn unreadable(&self, reason: impl Display) {
        self.send(TransportEventKind::Unreadable(reason.to_string()));
    }

    pub fn error(&self, err: impl Display) {
        self.send(TransportEventKind::Error(err.to_string()));
    }

    pub fn closed(&self) {
        self.send(TransportEventKind::Closed);
    }

    fn send(&self, kind: TransportEventKind) {
        // Receiver gone means the connection was dropped; nothing to report to.
        let _ = self.events.send(TransportEvent {
            generation: self.generation,
            kind,
        });
    }
}

/// Owning side of an open transport. Closing or dropping it fires the
/// matching [`CloseSignal`].
#[derive(Debug)]
pub struct TransportHandle {
    close: oneshot::Sender<()>,
}

impl TransportHandle {
    /// Create a handle and the signal the transport should watch.
    pub fn pair() -> (TransportHandle, CloseSignal) {
        let (tx, rx) = oneshot::channel();
        (
            TransportHandle { close: tx },
            CloseSignal {
                rx,
                fired: false,
            },
        )
    }

    pub fn close(self) {
        let _ = self.close.send(());
    }
}

/// Transport side of a [`TransportHandle`].
#[derive(Debug)]
pub struct CloseSignal {
    rx: oneshot::Receiver<()>,
    fired: bool,
}

impl CloseSignal {
    /// Resolves once the owner closes or drops the handle.
    pub async fn closed(&mut self) {
        // ---
        if self.fired {
            return;
        }
        let _ = (&mut self.rx).await;
        self.fired = true;
    }

    /// Non-blocking check of whether the owner has let go.
    pub fn is_closed(&mut self) -> bool {
        // ---
        if !self.fired {
            self.fired = !matches!(
                self.rx.try_recv(),
                Err(oneshot::error::TryRecvError::Empty)
            );
        }
        self.fired
    }
}

/// Opens transports for a [`StreamConnection`](super::StreamConnection).
pub trait Connector: Send + 'static {
    /// Begin opening a transport that reports through `sink`.
    ///
    /// Must not block: connection setup happens in the background and its
    /// outcome is reported as `Opened` or `Error`.
    fn open(&mut self, sink: TransportSink) -> TransportHandle;
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_close_fires_signal() {
        // ---
        let (handle, mut signal) = TransportHandle::pair();
        assert!(!signal.is_closed());
        handle.close();
        assert!(signal.is_closed());
        assert!(signal.is_closed());
    }

    #[test]
    fn test_drop_fires_signal() {
        // ---
        let (handle, mut signal) = TransportHandle::pair();
        drop(handle);
        assert!(signal.is_closed());
    }

    #[test]
    fn test_sink_tags_generation() {
        // ---
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(7, tx);
        sink.message("hello");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.generation, 7);
        assert_eq!(event.kind, TransportEventKind::Message("hello".to_string()));
    }
}
