//! WebSocket transport for the collector's alert stream.

use std::string::FromUtf8Error;

use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

use super::transport::{CloseSignal, Connector, TransportHandle, TransportSink};

// ---

/// Opens WebSocket transports to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    fn open(&mut self, sink: TransportSink) -> TransportHandle {
        // ---
        let (handle, close) = TransportHandle::pair();
        tokio::spawn(run_socket(self.url.clone(), sink, close));
        handle
    }
}

/// Drive one socket from handshake to close, reporting through `sink`.
async fn run_socket(url: String, sink: TransportSink, mut close: CloseSignal) {
    // ---
    let generation = sink.generation();
    debug!("[ws#{}] connecting to {}", generation, url);

    let connected = tokio::select! {
        res = connect_async(url.as_str()) => res,
        _ = close.closed() => {
            debug!("[ws#{}] closed before handshake completed", generation);
            return;
        }
    };

    let mut socket = match connected {
        Ok((socket, _response)) => socket,
        Err(e) => {
            sink.error(e);
            return;
        }
    };

    info!("[ws#{}] connected to {}", generation, url);
    sink.opened();

    loop {
        tokio::select! {
            _ = close.closed() => {
                debug!("[ws#{}] closing on request", generation);
                let _ = socket.close(None).await;
                return;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => sink.message(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => match binary_text(bytes.to_vec()) {
                    Ok(text) => sink.message(text),
                    Err(e) => {
                        debug!("[ws#{}] binary frame is not UTF-8: {}", generation, e);
                        sink.unreadable(e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("[ws#{}] server closed: {:?}", generation, frame);
                    sink.closed();
                    return;
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.error(e);
                    return;
                }
                None => {
                    sink.closed();
                    return;
                }
            },
        }
    }
}

/// Binary frames are accepted only when they carry valid UTF-8 text.
fn binary_text(bytes: Vec<u8>) -> Result<String, FromUtf8Error> {
    String::from_utf8(bytes)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_binary_utf8_frame_is_text() {
        // ---
        let frame = br#"{"type":"alert"}"#.to_vec();
        assert_eq!(binary_text(frame).unwrap(), r#"{"type":"alert"}"#);
    }

    #[test]
    fn test_binary_invalid_utf8_rejected() {
        // ---
        assert!(binary_text(vec![b'{', 0xff, 0xfe, b'}']).is_err());
    }
}
