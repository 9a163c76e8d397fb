//! Transport seam: how the live-update client opens sessions.
//!
//! DESIGN
//! ======
//! The client never touches a socket directly. A [`Connector`] opens a
//! [`Session`]: a command sender for outbound text and close requests, and
//! an event receiver for inbound text, transport errors, and the close
//! notification. The production connector is [`WsConnector`]; tests plug in
//! an in-process connector built on [`Session::pair`].
//!
//! LIFECYCLE
//! =========
//! 1. `open` resolves once the WebSocket handshake completes
//! 2. A pump task forwards commands to the socket and frames to the session
//! 3. On remote close, read error, or `Outgoing::Close`, the pump reports
//!    `Incoming::Closed` and exits

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
    #[error("websocket connect failed: {0}")]
    Connect(Box<WsError>),
    /// The endpoint answered the handshake with a non-upgrade HTTP status.
    #[error("connection rejected: {0}")]
    Rejected(String),
}

/// Command sent from the client to an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Close,
}

/// Event reported by an open session.
///
/// The receiver ending without `Closed` means the same as `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Error(String),
    Closed,
}

/// Client-side handles for one transport session.
#[derive(Debug)]
pub struct Session {
    pub outgoing: mpsc::UnboundedSender<Outgoing>,
    pub incoming: mpsc::UnboundedReceiver<Incoming>,
}

/// Transport-side handles paired with a [`Session`].
#[derive(Debug)]
pub struct RemoteEnd {
    pub incoming: mpsc::UnboundedSender<Incoming>,
    pub outgoing: mpsc::UnboundedReceiver<Outgoing>,
}

impl Session {
    /// Create a connected session/remote pair.
    #[must_use]
    pub fn pair() -> (Session, RemoteEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (Session { outgoing: out_tx, incoming: in_rx }, RemoteEnd { incoming: in_tx, outgoing: out_rx })
    }
}

/// Opens transport sessions to a live-update endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> Result<Session, TransportError>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Session, TransportError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::InvalidUrl(url.to_owned()));
        }

        let (stream, _) = connect_async(url).await.map_err(|error| match error {
            WsError::Http(response) => TransportError::Rejected(format!("HTTP {}", response.status())),
            other => TransportError::Connect(Box::new(other)),
        })?;

        let (session, remote) = Session::pair();
        tokio::spawn(pump(stream, remote));
        Ok(session)
    }
}

async fn pump(stream: WebSocketStream<MaybeTlsStream<TcpStream>>, mut remote: RemoteEnd) {
    let (mut ws_write, mut ws_read) = stream.split();

    loop {
        tokio::select! {
            cmd = remote.outgoing.recv() => match cmd {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                        let _ = remote.incoming.send(Incoming::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outgoing::Close) | None => break,
            },
            msg = ws_read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = remote.incoming.send(Incoming::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        let _ = remote.incoming.send(Incoming::Text(text));
                    }
                    Err(_) => warn!(len = bytes.len(), "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "live-update endpoint closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = remote.incoming.send(Incoming::Error(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    let _ = ws_write.close().await;
    let _ = remote.incoming.send(Incoming::Closed);
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
