//! Error taxonomy for the imagewire client.
//!
//! One [`Error`] enum covers every failure a caller can observe:
//! configuration and dial failures at construction, per-exchange failures
//! (decode, remote error, timeout, cancellation), and the request
//! validation errors raised by the domain operations. Transport-level
//! failures never surface here directly — the connection supervisor
//! handles them and callers only see their own exchange resolve.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a server-reported error frame.
///
/// The service identifies errors by a numeric `errorId`. Known ids map to
/// named kinds; everything else is [`RemoteErrorKind::Unknown`] and still
/// carries the original id and message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The credential was rejected (`errorId` 19).
    InvalidApiKey,
    /// An error id the client does not recognize.
    Unknown,
}

impl RemoteErrorKind {
    /// Map a wire `errorId` to a kind.
    #[must_use]
    pub fn from_id(id: Option<i64>) -> Self {
        match id {
            Some(19) => Self::InvalidApiKey,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidApiKey => write!(f, "invalid api key"),
            Self::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Errors surfaced by the imagewire client.
#[derive(Debug, Error)]
pub enum Error {
    /// Construction was attempted without an API key.
    #[error("api key is required")]
    MissingApiKey,

    /// Dialing the service failed.
    #[error("cannot connect to ws: [{addr}] {reason}")]
    Dial {
        /// The endpoint that was dialed.
        addr: String,
        /// What the transport reported.
        reason: String,
    },

    /// No live connection exists to write to.
    #[error("not connected")]
    NotConnected,

    /// An outgoing payload was absent.
    #[error("outgoing message cannot be nil")]
    EmptyPayload,

    /// Serializing an outbound frame failed.
    #[error("cannot encode message: [{reason}]")]
    Encode {
        /// Serializer diagnostics.
        reason: String,
    },

    /// An inbound frame was not a well-formed event mapping, or a payload
    /// did not match its expected shape.
    #[error("cannot decode message: [{reason}]")]
    Decode {
        /// Decoder diagnostics.
        reason: String,
    },

    /// Writing a frame to the transport failed.
    #[error("write failed: [{reason}]")]
    Write {
        /// What the transport reported.
        reason: String,
    },

    /// The service reported an error frame (`error: true`).
    #[error("{kind}: [{id_text}:{message}]", id_text = .id.map_or_else(|| "?".to_string(), |i| i.to_string()))]
    Remote {
        /// Mapped error kind.
        kind: RemoteErrorKind,
        /// The wire `errorId`, when present.
        id: Option<i64>,
        /// The wire `errorMessage`, when present.
        message: String,
    },

    /// No matching response arrived within the per-exchange timeout.
    #[error("request timeout: [{event}]")]
    RequestTimeout {
        /// The event name that was sent.
        event: String,
    },

    /// The caller's cancellation signal fired.
    #[error("request cancelled")]
    Cancelled,

    /// A second exchange was started while one was already awaiting the
    /// same response event. Only one exchange per response event may be
    /// outstanding at a time.
    #[error("an exchange awaiting [{event}] is already in flight")]
    ExchangeInFlight {
        /// The contested response event name.
        event: String,
    },

    /// A required request field was empty.
    #[error("field is required: [{field}]")]
    FieldRequired {
        /// The wire name of the missing field.
        field: &'static str,
    },

    /// A request field was outside its accepted range.
    #[error("field has incorrect value: [{field}][{range}]")]
    FieldOutOfRange {
        /// The wire name of the offending field.
        field: &'static str,
        /// The accepted range, for the message.
        range: &'static str,
    },

    /// Upload data was not valid base64.
    #[error("image is not valid base64")]
    ImageNotBase64,

    /// Upload data used a malformed `data:image/...` URI.
    #[error("image data uri is malformed")]
    ImageWrongSchema,

    /// The image header could not be read.
    #[error("cannot read image header: [{reason}]")]
    ImageHeader {
        /// What went wrong while sniffing.
        reason: &'static str,
    },

    /// The image signature matched no supported format.
    #[error("unsupported image format")]
    ImageUnsupported,
}

impl Error {
    /// Build a [`Error::Remote`] from wire error-frame fields.
    #[must_use]
    pub fn remote(id: Option<i64>, message: impl Into<String>) -> Self {
        Self::Remote {
            kind: RemoteErrorKind::from_id(id),
            id,
            message: message.into(),
        }
    }
}
