//! # imagewire
//!
//! Client SDK for the Imagewire image-generation service. One persistent
//! WebSocket carries many logically independent request/response exchanges;
//! a response is correlated to its request by a well-known response event
//! name in the payload rather than a request id.
//!
//! The engine owns the whole connection lifecycle:
//!
//! - **handshake** — the credential (and, after the first connect, the
//!   remembered resumption token) is presented before the client is usable
//! - **keep-alive** — optional periodic liveness probing
//! - **reconnection** — abnormal closures are redialed with backoff and
//!   the session is resumed transparently; in-flight exchanges only ever
//!   observe their own typed result, timeout, or cancellation
//!
//! # Usage
//!
//! ```no_run
//! use imagewire::{Client, Config, GenerateImagesRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> imagewire::Result<()> {
//! let client = Client::connect(Config::new("my-api-key")).await?;
//! let cancel = CancellationToken::new();
//! let images = client
//!     .generate_images(&cancel, GenerateImagesRequest {
//!         prompt_text: "a lighthouse at dusk".into(),
//!         number_results: 2,
//!         ..GenerateImagesRequest::default()
//!     })
//!     .await?;
//! println!("got {} images", images.images.len());
//! # Ok(())
//! # }
//! ```
//!
//! Only one exchange per response event name may be outstanding at a time;
//! a second concurrent call for the same response event fails with
//! [`Error::ExchangeInFlight`]. This mirrors the service protocol, which
//! carries no per-request correlation id for the client to disambiguate by.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod frame;
pub mod ops;
pub mod transport;
pub mod types;

mod correlator;
mod router;
mod supervisor;

pub use client::Client;
pub use config::Config;
pub use errors::{Error, RemoteErrorKind, Result};
pub use ops::{
    CaptionImageRequest, CaptionImageResponse, EnhancePromptRequest, EnhancePromptResponse,
    GenerateImagesRequest, GenerateImagesResponse, PreprocessGuideRequest,
    PreprocessGuideResponse, UploadImageRequest, UploadImageResponse, UpscaleImageRequest,
    UpscaleImageResponse,
};
pub use supervisor::ConnectionState;
pub use types::{ControlNet, GeneratedText, Image, Lora};
