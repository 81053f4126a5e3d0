//! The client handle: construction, session identity, and the public
//! request surface.
//!
//! [`Client::connect`] dials, spawns the connection tasks, and runs the
//! session handshake before returning — a constructed client is always a
//! handshaken one. The resumption token returned by the handshake is
//! remembered and replayed on every later handshake, so the service can
//! restore the session association across reconnects.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::correlator::Correlator;
use crate::errors::{Error, Result};
use crate::events;
use crate::frame;
use crate::supervisor::{ConnectionState, Supervisor};
use crate::transport::{Connector, WsConnector};

/// Capacity of the `reconnected` notification channel.
const RECONNECTED_CAPACITY: usize = 8;

// ─────────────────────────────────────────────────────────────────────────────
// Session identity
// ─────────────────────────────────────────────────────────────────────────────

/// Credential plus the resumption token learned from the handshake.
///
/// The token is written only by whichever task completes a handshake and
/// read only when composing the next one.
pub(crate) struct SessionState {
    api_key: String,
    token: RwLock<Option<String>>,
}

impl SessionState {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            token: RwLock::new(None),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn store_token(&self, token: String) {
        *self.token.write() = Some(token);
    }
}

/// Handshake request payload.
#[derive(Serialize)]
struct HandshakeRequest<'a> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    #[serde(rename = "connectionSessionUUID", skip_serializing_if = "Option::is_none")]
    connection_session_uuid: Option<String>,
}

/// Handshake response payload.
#[derive(Deserialize)]
struct HandshakeResponse {
    #[serde(rename = "connectionSessionUUID")]
    connection_session_uuid: String,
}

/// One handshake round-trip: present the credential (and any remembered
/// resumption token), store the token that comes back.
pub(crate) async fn run_handshake(
    correlator: &Correlator,
    session: &SessionState,
    cancel: &CancellationToken,
) -> Result<String> {
    let request = HandshakeRequest {
        api_key: session.api_key(),
        connection_session_uuid: session.token(),
    };
    let payload = serde_json::to_value(&request).map_err(|e| Error::Encode {
        reason: e.to_string(),
    })?;

    let value = correlator
        .send_and_await(
            cancel,
            events::NEW_CONNECTION,
            events::NEW_CONNECTION_SESSION_UUID,
            &payload,
        )
        .await?;

    let response: HandshakeResponse =
        serde_json::from_value(value).map_err(|e| Error::Decode {
            reason: e.to_string(),
        })?;
    session.store_token(response.connection_session_uuid.clone());
    debug!(session = %response.connection_session_uuid, "handshake complete");
    Ok(response.connection_session_uuid)
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to one persistent connection.
///
/// Cheap to share behind an `Arc`; all request methods take `&self` and
/// may run concurrently — with the one documented restriction that only a
/// single exchange per response event name may be outstanding at a time.
pub struct Client {
    pub(crate) config: Config,
    pub(crate) correlator: Arc<Correlator>,
    session: Arc<SessionState>,
    state_rx: watch::Receiver<ConnectionState>,
    reconnected_tx: broadcast::Sender<()>,
    shutdown: CancellationToken,
}

impl Client {
    /// Connect to the production service (or `config.endpoint`).
    ///
    /// Returns once dial and handshake both succeeded; either failing is
    /// fatal to construction and nothing keeps running afterwards.
    pub async fn connect(config: Config) -> Result<Self> {
        Self::connect_with(config, Arc::new(WsConnector)).await
    }

    /// Connect through a custom [`Connector`]. Tests use this seam to
    /// drive the engine without a live service.
    pub async fn connect_with(config: Config, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state_tx = Arc::new(state_tx);
        let (reconnected_tx, _) = broadcast::channel(RECONNECTED_CAPACITY);
        let (disruption_tx, disruption_rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();

        let correlator = Arc::new(Correlator::new(config.request_timeout));
        let session = Arc::new(SessionState::new(config.api_key.clone()));

        // startup dial failure is fatal; no retry at this stage
        let (sink, stream) = connector.connect(&config.endpoint).await?;

        let mut supervisor = Supervisor::new(
            connector,
            correlator.clone(),
            session.clone(),
            config.clone(),
            state_tx.clone(),
            reconnected_tx.clone(),
            disruption_tx,
            shutdown.clone(),
        );
        let epoch = supervisor.spawn_epoch(sink, stream);
        tokio::spawn(supervisor.run(epoch, disruption_rx));

        // startup handshake failure is equally fatal: tear the tasks down
        // and report, never hand out a half-initialized client
        match run_handshake(&correlator, &session, &shutdown).await {
            Ok(token) => {
                let _ = state_tx.send_replace(ConnectionState::Connected);
                info!(session = %token, "connected");
            }
            Err(err) => {
                shutdown.cancel();
                return Err(err);
            }
        }

        Ok(Self {
            config,
            correlator,
            session,
            state_rx,
            reconnected_tx,
            shutdown,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Watch lifecycle state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Subscribe to successful-reconnect notifications.
    #[must_use]
    pub fn reconnected(&self) -> broadcast::Receiver<()> {
        self.reconnected_tx.subscribe()
    }

    /// The credential this client presents.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.session.api_key()
    }

    /// The resumption token from the most recent handshake.
    #[must_use]
    pub fn session_uuid(&self) -> Option<String> {
        self.session.token()
    }

    /// Whether a handshaken connection is currently live.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state() == ConnectionState::Connected && self.session.token().is_some()
    }

    /// Send one event without awaiting any response.
    pub async fn send_event(&self, event: &str, payload: &Value) -> Result<()> {
        let text = frame::encode_envelope(event, payload)?;
        self.correlator.send_raw(text).await
    }

    /// Send `{event: payload}` and await the named response event.
    ///
    /// Resolves with exactly one of: the matched payload, a typed error
    /// (remote error frame, decode failure, write failure), a timeout
    /// tagged with `event`, or [`Error::Cancelled`] when `cancel` fires —
    /// cancellation wins any simultaneous race. Only one exchange per
    /// `response_event` may be outstanding at a time; a second concurrent
    /// call fails with [`Error::ExchangeInFlight`].
    pub async fn send_and_await(
        &self,
        cancel: &CancellationToken,
        event: &str,
        response_event: &str,
        payload: &Value,
    ) -> Result<Value> {
        self.correlator
            .send_and_await(cancel, event, response_event, payload)
            .await
    }

    /// Shut down: stop the supervisor and both connection tasks.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("session", &self.session_uuid())
            .finish_non_exhaustive()
    }
}
