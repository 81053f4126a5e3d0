//! Connection lifecycle: read/write tasks, liveness probing, reconnection.
//!
//! The supervisor exclusively owns the transport halves. Each established
//! connection is an *epoch*: one write task draining the outbound queue
//! (and ticking liveness probes when keep-alive is on), one read task
//! feeding the router. On a disruption the supervisor cancels the epoch,
//! swaps in a fresh connection, and replays the session handshake before
//! declaring the connection recovered. In-flight exchanges are never
//! force-failed — at worst they resolve through their own timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{SessionState, run_handshake};
use crate::config::Config;
use crate::correlator::{Correlator, OutboundFrame};
use crate::router;
use crate::transport::{Connector, FrameSink, FrameStream, Inbound, ReadError};

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Redial budget for abnormal closures (likely transient).
const ABNORMAL_CLOSURE_ATTEMPTS: u32 = 3;
/// Redial budget for every other disruption.
const DEFAULT_ATTEMPTS: u32 = 1;

/// Observable connection lifecycle states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no recovery in progress.
    Disconnected,
    /// The initial dial and handshake are running.
    Connecting,
    /// A handshaken connection is live.
    Connected,
    /// A failure was observed; recovery is about to begin.
    Degraded(String),
    /// Redial attempts are in progress.
    Reconnecting,
}

/// Liveness flag shared between the router (reset on heartbeat replies)
/// and the write task (checked at each probe tick).
#[derive(Debug, Default)]
pub(crate) struct Liveness {
    alive: AtomicBool,
}

impl Liveness {
    /// A heartbeat reply arrived.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// A probe is about to go out; clear the flag until the reply.
    pub fn expect_reply(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    /// Whether a reply arrived since the last probe.
    pub fn check_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}

/// What took a connection down.
#[derive(Debug)]
pub(crate) enum DisruptionCause {
    /// The read side failed.
    Read(ReadError),
    /// A liveness probe could not be written.
    ProbeWrite(String),
}

impl DisruptionCause {
    fn budget_and_reason(&self) -> (u32, String) {
        match self {
            Self::Read(ReadError::AbnormalClosure(reason)) => {
                (ABNORMAL_CLOSURE_ATTEMPTS, format!("abnormal closure: {reason}"))
            }
            Self::Read(ReadError::Other(reason)) => {
                (DEFAULT_ATTEMPTS, format!("read failed: {reason}"))
            }
            Self::ProbeWrite(reason) => {
                (DEFAULT_ATTEMPTS, format!("probe write failed: {reason}"))
            }
        }
    }
}

/// A disruption report from one of an epoch's tasks.
#[derive(Debug)]
pub(crate) struct Disruption {
    epoch: u64,
    cause: DisruptionCause,
}

/// One established connection's tasks.
pub(crate) struct Epoch {
    id: u64,
    cancel: CancellationToken,
    _write_task: JoinHandle<()>,
    _read_task: JoinHandle<()>,
}

/// Owns the transport and drives the connection state machine.
pub(crate) struct Supervisor {
    connector: Arc<dyn Connector>,
    correlator: Arc<Correlator>,
    session: Arc<SessionState>,
    config: Config,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    reconnected_tx: broadcast::Sender<()>,
    disruption_tx: mpsc::Sender<Disruption>,
    shutdown: CancellationToken,
    epoch_seq: u64,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connector: Arc<dyn Connector>,
        correlator: Arc<Correlator>,
        session: Arc<SessionState>,
        config: Config,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        reconnected_tx: broadcast::Sender<()>,
        disruption_tx: mpsc::Sender<Disruption>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            connector,
            correlator,
            session,
            config,
            state_tx,
            reconnected_tx,
            disruption_tx,
            shutdown,
            epoch_seq: 0,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send_replace(state);
    }

    /// Install a fresh connection: outbound queue, write task, read task.
    pub fn spawn_epoch(
        &mut self,
        sink: Box<dyn FrameSink>,
        stream: Box<dyn FrameStream>,
    ) -> Epoch {
        self.epoch_seq += 1;
        let id = self.epoch_seq;
        let cancel = self.shutdown.child_token();
        let liveness = Arc::new(Liveness::default());

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        self.correlator.install_writer(out_tx);

        let write_task = tokio::spawn(run_writer(
            sink,
            out_rx,
            self.config.keep_alive,
            self.config.ping_interval,
            liveness.clone(),
            self.disruption_tx.clone(),
            id,
            cancel.clone(),
        ));
        let read_task = tokio::spawn(run_reader(
            stream,
            self.correlator.clone(),
            liveness,
            self.disruption_tx.clone(),
            id,
            cancel.clone(),
        ));

        Epoch {
            id,
            cancel,
            _write_task: write_task,
            _read_task: read_task,
        }
    }

    /// Supervision loop: watch for disruptions until shut down.
    pub async fn run(mut self, mut epoch: Epoch, mut disruptions: mpsc::Receiver<Disruption>) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    self.correlator.clear_writer();
                    epoch.cancel.cancel();
                    self.set_state(ConnectionState::Disconnected);
                    debug!("supervisor shut down");
                    break;
                }
                disruption = disruptions.recv() => {
                    let Some(Disruption { epoch: source, cause }) = disruption else { break };
                    if source != epoch.id {
                        debug!(source, "ignoring disruption from a replaced connection");
                        continue;
                    }

                    let (budget, reason) = cause.budget_and_reason();
                    warn!(%reason, budget, "connection degraded");
                    self.set_state(ConnectionState::Degraded(reason));
                    epoch.cancel.cancel();
                    self.correlator.clear_writer();

                    match self.reconnect(budget).await {
                        Some(next) => epoch = next,
                        None => {
                            self.set_state(ConnectionState::Disconnected);
                            warn!("reconnect attempts exhausted; connection closed");
                            // pending exchanges resolve through their own
                            // timeouts rather than being force-failed
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Redial up to `budget` times with a fixed backoff between attempts.
    ///
    /// A reconnect is complete only once the handshake round-trip, carrying
    /// the remembered resumption token, has succeeded.
    async fn reconnect(&mut self, budget: u32) -> Option<Epoch> {
        self.set_state(ConnectionState::Reconnecting);

        for attempt in 1..=budget {
            if self.shutdown.is_cancelled() {
                return None;
            }
            if attempt > 1 {
                tokio::select! {
                    () = self.shutdown.cancelled() => return None,
                    () = tokio::time::sleep(self.config.reconnect_backoff) => {}
                }
            }

            info!(attempt, budget, "redialing");
            let (sink, stream) = match self.connector.connect(&self.config.endpoint).await {
                Ok(halves) => halves,
                Err(err) => {
                    warn!(attempt, error = %err, "redial failed");
                    continue;
                }
            };

            let epoch = self.spawn_epoch(sink, stream);
            match run_handshake(&self.correlator, &self.session, &self.shutdown).await {
                Ok(_) => {
                    self.set_state(ConnectionState::Connected);
                    info!(attempt, "reconnected");
                    let _ = self.reconnected_tx.send(());
                    return Some(epoch);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "reconnect handshake failed");
                    epoch.cancel.cancel();
                    self.correlator.clear_writer();
                }
            }
        }
        None
    }
}

/// Single writer for one connection. Drains the outbound queue; when
/// keep-alive is on, also ticks liveness probes.
#[allow(clippy::too_many_arguments)]
async fn run_writer(
    mut sink: Box<dyn FrameSink>,
    mut queue: mpsc::Receiver<OutboundFrame>,
    keep_alive: bool,
    ping_interval: std::time::Duration,
    liveness: Arc<Liveness>,
    disruptions: mpsc::Sender<Disruption>,
    epoch: u64,
    cancel: CancellationToken,
) {
    let mut ping = tokio::time::interval(ping_interval);
    // skip the immediate first tick
    let _ = ping.tick().await;
    let mut probe_sent = false;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                sink.close().await;
                break;
            }
            cmd = queue.recv() => {
                let Some(OutboundFrame { text, ack }) = cmd else { break };
                let result = sink.send_text(text).await;
                if let Err(ref err) = result {
                    // the read side notices a dead connection and drives
                    // recovery; the caller just gets its write error
                    warn!(error = %err, "frame write failed");
                }
                let _ = ack.send(result);
            }
            _ = ping.tick(), if keep_alive => {
                if probe_sent && !liveness.check_alive() {
                    warn!("no liveness reply since last probe");
                }
                liveness.expect_reply();
                if let Err(err) = sink.send_ping().await {
                    let _ = disruptions
                        .send(Disruption { epoch, cause: DisruptionCause::ProbeWrite(err.to_string()) })
                        .await;
                    break;
                }
                probe_sent = true;
            }
        }
    }
}

/// Single reader for one connection. Feeds every message to the router
/// until the stream fails, then reports the classified cause.
async fn run_reader(
    mut stream: Box<dyn FrameStream>,
    correlator: Arc<Correlator>,
    liveness: Arc<Liveness>,
    disruptions: mpsc::Sender<Disruption>,
    epoch: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            msg = stream.next_message() => match msg {
                Ok(Inbound::Text(text)) => router::route(correlator.registry(), &liveness, &text),
                Ok(Inbound::Pong) => liveness.mark_alive(),
                Err(err) => {
                    debug!(?err, "read loop stopped");
                    let _ = disruptions
                        .send(Disruption { epoch, cause: DisruptionCause::Read(err) })
                        .await;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_closure_gets_the_larger_budget() {
        let cause = DisruptionCause::Read(ReadError::AbnormalClosure("gone".into()));
        let (budget, reason) = cause.budget_and_reason();
        assert_eq!(budget, 3);
        assert!(reason.contains("abnormal closure"));
    }

    #[test]
    fn plain_read_errors_get_one_attempt() {
        let cause = DisruptionCause::Read(ReadError::Other("eof".into()));
        let (budget, reason) = cause.budget_and_reason();
        assert_eq!(budget, 1);
        assert!(reason.contains("read failed"));
    }

    #[test]
    fn probe_write_failures_get_one_attempt() {
        let cause = DisruptionCause::ProbeWrite("broken pipe".into());
        let (budget, _) = cause.budget_and_reason();
        assert_eq!(budget, 1);
    }

    #[test]
    fn liveness_toggles() {
        let liveness = Liveness::default();
        liveness.mark_alive();
        assert!(liveness.check_alive());
        liveness.expect_reply();
        assert!(!liveness.check_alive());
    }
}
