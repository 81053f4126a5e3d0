//! Inbound frame classification and the outbound event envelope.
//!
//! Every message on the socket is a JSON mapping. Outbound messages carry
//! exactly one top-level key, `{eventName: payload}`. Inbound messages are
//! classified into a closed set of variants with ordered matching: an error
//! frame beats everything, a lone heartbeat-reply marker is consumed
//! silently, and anything else is a list of named events.

use serde_json::{Map, Value};

use crate::errors::{Error, RemoteErrorKind, Result};
use crate::events;

/// A server-reported error frame (`error: true`).
#[derive(Clone, Debug)]
pub struct ErrorFrame {
    /// Mapped error kind.
    pub kind: RemoteErrorKind,
    /// The wire `errorId`, when present.
    pub id: Option<i64>,
    /// The wire `errorMessage`, when present.
    pub message: String,
}

impl ErrorFrame {
    /// The caller-facing error for this frame.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::Remote {
            kind: self.kind,
            id: self.id,
            message: self.message,
        }
    }
}

/// One decoded inbound message.
#[derive(Clone, Debug)]
pub enum InboundFrame {
    /// The message reported a server-side error.
    Error(ErrorFrame),
    /// The message was only the heartbeat-reply marker.
    HeartbeatReply,
    /// Named domain events, in map order.
    Events(Vec<(String, Value)>),
}

impl InboundFrame {
    /// Decode and classify one raw text frame.
    ///
    /// Fails with [`Error::Decode`] when the text is not a JSON mapping.
    /// That failure is fatal to the exchange currently being resolved, not
    /// to the connection.
    pub fn parse(text: &str) -> Result<Self> {
        let map: Map<String, Value> =
            serde_json::from_str(text).map_err(|e| Error::Decode { reason: e.to_string() })?;

        if map.get("error").and_then(Value::as_bool) == Some(true) {
            let id = map
                .get("errorId")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));
            let message = map
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Self::Error(ErrorFrame {
                kind: RemoteErrorKind::from_id(id),
                id,
                message,
            }));
        }

        if map.len() == 1 && map.contains_key(events::PONG) {
            return Ok(Self::HeartbeatReply);
        }

        let entries = map
            .into_iter()
            .filter(|(key, _)| key != events::PONG)
            .collect();
        Ok(Self::Events(entries))
    }
}

/// Encode the single-key `{event: payload}` envelope as a text frame.
///
/// Rejects an absent payload with [`Error::EmptyPayload`].
pub fn encode_envelope(event: &str, payload: &Value) -> Result<String> {
    if payload.is_null() {
        return Err(Error::EmptyPayload);
    }
    let mut envelope = Map::with_capacity(1);
    envelope.insert(event.to_string(), payload.clone());
    serde_json::to_string(&Value::Object(envelope)).map_err(|e| Error::Encode {
        reason: e.to_string(),
    })
}
