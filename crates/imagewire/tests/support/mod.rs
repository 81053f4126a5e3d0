//! Scripted transport for driving the engine without a live service.
//!
//! [`ScriptedConnector`] hands the engine channel-backed connection halves
//! and surfaces each accepted connection to the test as a [`TestConn`],
//! which reads the frames the client wrote and pushes inbound frames or
//! read failures.

// not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use imagewire::errors::Error;
use imagewire::transport::{Connector, FrameSink, FrameStream, Inbound, ReadError};
use imagewire::{Client, Config};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// One scripted connection, as seen from the service side.
pub struct TestConn {
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<Result<Inbound, ReadError>>,
    /// Liveness probes the client wrote.
    pub pings: mpsc::UnboundedReceiver<()>,
    /// Flip to make every subsequent write on this connection fail.
    pub fail_writes: Arc<AtomicBool>,
}

impl TestConn {
    /// Next frame the client wrote, parsed as JSON.
    pub async fn next_outbound(&mut self) -> Value {
        let text = tokio::time::timeout(std::time::Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("client closed the write side");
        serde_json::from_str(&text).expect("client wrote invalid JSON")
    }

    /// Push one inbound JSON frame to the client.
    pub fn push_json(&self, value: Value) {
        let _ = self.inbound.send(Ok(Inbound::Text(value.to_string())));
    }

    /// Push one raw inbound text frame to the client.
    pub fn push_text(&self, text: &str) {
        let _ = self.inbound.send(Ok(Inbound::Text(text.to_string())));
    }

    /// Fail the client's read side with `err`.
    pub fn fail_read(&self, err: ReadError) {
        let _ = self.inbound.send(Err(err));
    }

    /// Answer a handshake: read the `newConnection` request, reply with
    /// `token`, and return the request payload for assertions.
    pub async fn accept_handshake(&mut self, token: &str) -> Value {
        let frame = self.next_outbound().await;
        let payload = frame["newConnection"].clone();
        assert!(!payload.is_null(), "expected a handshake, got {frame}");
        self.push_json(json!({
            "newConnectionSessionUUID": { "connectionSessionUUID": token }
        }));
        payload
    }
}

struct ScriptedSink {
    outbound: mpsc::UnboundedSender<String>,
    pings: mpsc::UnboundedSender<()>,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for ScriptedSink {
    async fn send_text(&mut self, frame: String) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Write {
                reason: "scripted write failure".into(),
            });
        }
        self.outbound.send(frame).map_err(|_| Error::Write {
            reason: "test dropped the connection".into(),
        })
    }

    async fn send_ping(&mut self) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Write {
                reason: "scripted probe failure".into(),
            });
        }
        let _ = self.pings.send(());
        Ok(())
    }

    async fn close(&mut self) {}
}

struct ScriptedStream {
    inbound: mpsc::UnboundedReceiver<Result<Inbound, ReadError>>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_message(&mut self) -> Result<Inbound, ReadError> {
        match self.inbound.recv().await {
            Some(item) => item,
            // the test dropped its handle without scripting a failure;
            // park instead of fabricating a disruption
            None => std::future::pending().await,
        }
    }
}

/// Connector that surfaces each accepted connection to the test.
pub struct ScriptedConnector {
    accepted: mpsc::UnboundedSender<TestConn>,
    fail_dials: AtomicUsize,
    dial_count: AtomicUsize,
}

impl ScriptedConnector {
    /// Fail the next `n` dials before accepting again.
    pub fn fail_next_dials(&self, n: usize) {
        self.fail_dials.store(n, Ordering::SeqCst);
    }

    /// Total dials attempted, successful or not.
    pub fn dials(&self) -> usize {
        self.dial_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        addr: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), Error> {
        let _ = self.dial_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_dials.load(Ordering::SeqCst) > 0 {
            let _ = self.fail_dials.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Dial {
                addr: addr.to_string(),
                reason: "scripted dial failure".into(),
            });
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (ping_tx, ping_rx) = mpsc::unbounded_channel();
        let fail_writes = Arc::new(AtomicBool::new(false));

        let _ = self.accepted.send(TestConn {
            outbound: out_rx,
            inbound: in_tx,
            pings: ping_rx,
            fail_writes: fail_writes.clone(),
        });

        Ok((
            Box::new(ScriptedSink {
                outbound: out_tx,
                pings: ping_tx,
                fail_writes,
            }),
            Box::new(ScriptedStream { inbound: in_rx }),
        ))
    }
}

/// A connector plus the stream of connections it accepts.
pub fn scripted_connector() -> (Arc<ScriptedConnector>, mpsc::UnboundedReceiver<TestConn>) {
    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
    (
        Arc::new(ScriptedConnector {
            accepted: accepted_tx,
            fail_dials: AtomicUsize::new(0),
            dial_count: AtomicUsize::new(0),
        }),
        accepted_rx,
    )
}

/// Route engine logs through the test harness. `RUST_LOG=debug` shows the
/// router's skip/unknown diagnostics.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with test-friendly timings.
pub fn test_config() -> Config {
    Config {
        request_timeout: std::time::Duration::from_millis(300),
        poll_timeout: std::time::Duration::from_millis(400),
        ping_interval: std::time::Duration::from_millis(40),
        reconnect_backoff: std::time::Duration::from_millis(20),
        ..Config::new("test-api-key")
    }
}

/// Connect a client through a scripted connector, answering the startup
/// handshake with `token`.
pub async fn connect_client(
    config: Config,
    token: &str,
) -> (
    Client,
    TestConn,
    Arc<ScriptedConnector>,
    mpsc::UnboundedReceiver<TestConn>,
) {
    init_tracing();
    let (connector, mut accepted) = scripted_connector();
    let handle = tokio::spawn(Client::connect_with(config, connector.clone()));
    let mut conn = accepted.recv().await.expect("no connection accepted");
    let _ = conn.accept_handshake(token).await;
    let client = handle
        .await
        .expect("connect task panicked")
        .expect("connect failed");
    (client, conn, connector, accepted)
}
