//! Transport seam over the WebSocket connection.
//!
//! The engine never touches `tokio-tungstenite` directly outside this
//! module: the supervisor dials through a [`Connector`] and hands the two
//! halves to its read and write tasks. Tests drive the whole engine through
//! a scripted connector; production uses [`WsConnector`].

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::errors::Error;

/// Why an established connection stopped yielding messages.
///
/// Going-away and abnormal-closure close codes are singled out: they are
/// the causes most likely to be transient, and the supervisor grants them
/// a larger reconnect budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadError {
    /// The peer vanished or closed with a going-away code.
    AbnormalClosure(String),
    /// Any other read failure, including a clean close.
    Other(String),
}

/// One message off the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame.
    Text(String),
    /// A protocol-level pong; resets liveness tracking.
    Pong,
}

/// Write half of a connection. Owned by the single write task.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame atomically.
    async fn send_text(&mut self, frame: String) -> Result<(), Error>;
    /// Write a liveness probe.
    async fn send_ping(&mut self) -> Result<(), Error>;
    /// Close the connection. Best effort.
    async fn close(&mut self);
}

/// Read half of a connection. Owned by the single read task.
#[async_trait]
pub trait FrameStream: Send {
    /// Next message, or the reason reading stopped.
    async fn next_message(&mut self) -> Result<Inbound, ReadError>;
}

/// Dials connections for the supervisor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `addr` and return its two halves.
    async fn connect(
        &self,
        addr: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), Error>;
}

// ─────────────────────────────────────────────────────────────────────────────
// tokio-tungstenite implementation
// ─────────────────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production connector over `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        addr: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), Error> {
        let (ws, _) = connect_async(addr).await.map_err(|e| Error::Dial {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let (tx, rx) = ws.split();
        Ok((Box::new(WsSink { inner: tx }), Box::new(WsSource { inner: rx })))
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, frame: String) -> Result<(), Error> {
        self.inner
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| Error::Write {
                reason: e.to_string(),
            })
    }

    async fn send_ping(&mut self) -> Result<(), Error> {
        self.inner
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| Error::Write {
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) {
        let _ = self.inner.send(Message::Close(None)).await;
    }
}

struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsSource {
    async fn next_message(&mut self) -> Result<Inbound, ReadError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text.to_string())),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => return Ok(Inbound::Text(text.to_string())),
                    Err(_) => {
                        debug!(len = data.len(), "dropping non-UTF8 binary frame");
                    }
                },
                Some(Ok(Message::Pong(_))) => return Ok(Inbound::Pong),
                // tungstenite queues the pong reply itself
                Some(Ok(Message::Ping(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => return Err(classify_close(frame)),
                Some(Err(err)) => return Err(classify_error(&err)),
                None => return Err(ReadError::Other("connection closed".to_string())),
            }
        }
    }
}

fn classify_close(frame: Option<CloseFrame>) -> ReadError {
    match frame {
        Some(f) if matches!(f.code, CloseCode::Away | CloseCode::Abnormal) => {
            ReadError::AbnormalClosure(format!("{}: {}", f.code, f.reason))
        }
        Some(f) => ReadError::Other(format!("closed: {}: {}", f.code, f.reason)),
        None => ReadError::Other("closed".to_string()),
    }
}

fn classify_error(err: &tungstenite::Error) -> ReadError {
    match err {
        // A dropped TCP connection with no closing handshake is the
        // 1006 abnormal-closure case.
        tungstenite::Error::Protocol(
            tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
        ) => ReadError::AbnormalClosure(err.to_string()),
        _ => ReadError::Other(err.to_string()),
    }
}
