//! Client configuration.
//!
//! [`Config`] carries the credential, the endpoint, and every tunable
//! interval. Compiled defaults match the production deployment; tests and
//! unusual deployments override individual fields.

use std::time::Duration;

use crate::errors::{Error, Result};

/// Production endpoint.
pub const PROD_ENDPOINT: &str = "wss://ws-api.imagewire.ai/v1";

/// Default timeout for a single request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default overall timeout for polling operations that accumulate results
/// over several exchanges.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);
/// Default liveness probe interval. Kept shorter than the peer's
/// idle-timeout window.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);
/// Default delay between redial attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Connection configuration consumed by [`crate::Client::connect`].
#[derive(Clone, Debug)]
pub struct Config {
    /// API credential. Required, non-empty.
    pub api_key: String,
    /// WebSocket endpoint. Defaults to the production endpoint.
    pub endpoint: String,
    /// Send periodic liveness probes. Off by default.
    pub keep_alive: bool,
    /// Timeout for a single request/response exchange.
    pub request_timeout: Duration,
    /// Overall timeout for polling operations.
    pub poll_timeout: Duration,
    /// Liveness probe interval (used when `keep_alive` is on).
    pub ping_interval: Duration,
    /// Delay between redial attempts.
    pub reconnect_backoff: Duration,
}

impl Config {
    /// Config with the given credential and defaults everywhere else.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Reject configurations that cannot possibly connect.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: PROD_ENDPOINT.to_string(),
            keep_alive: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }
}
