//! Pending-exchange registry and the send-and-await primitive.
//!
//! A caller registers interest in a response event name *before* its
//! request is written, closing the race between the router seeing the
//! reply and the waiter being recorded. The exchange then resolves exactly
//! once: matched payload, matched error, timeout, or cancellation —
//! whichever wins. Cancellation is checked first, so a caller that cancels
//! observes cancellation even when a response is simultaneously available.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::frame;

/// One frame queued for the single write task, acked with the write result.
pub(crate) struct OutboundFrame {
    /// The serialized text frame.
    pub text: String,
    /// Resolves once the write completed or failed.
    pub ack: oneshot::Sender<Result<()>>,
}

/// Delivery half of one pending exchange.
struct Waiter {
    tx: oneshot::Sender<Result<Value>>,
    created_at: Instant,
}

/// Registry of pending exchanges keyed by expected response event name.
///
/// Mutated from two sides — callers insert and remove, the router delivers
/// and removes — so every access goes through the one mutex.
#[derive(Default)]
pub(crate) struct Registry {
    waiters: Mutex<HashMap<String, Waiter>>,
}

impl Registry {
    /// Register a waiter for `event`. At most one waiter per event name
    /// may be outstanding; a second registration is a caller error.
    pub(crate) fn register(&self, event: &str) -> Result<oneshot::Receiver<Result<Value>>> {
        let mut waiters = self.waiters.lock();
        if waiters.contains_key(event) {
            return Err(Error::ExchangeInFlight {
                event: event.to_string(),
            });
        }
        let (tx, rx) = oneshot::channel();
        let previous = waiters.insert(
            event.to_string(),
            Waiter {
                tx,
                created_at: Instant::now(),
            },
        );
        debug_assert!(previous.is_none());
        Ok(rx)
    }

    /// Drop the waiter for `event`, if still present.
    pub(crate) fn unregister(&self, event: &str) {
        let _ = self.waiters.lock().remove(event);
    }

    /// Deliver `payload` to the waiter for `event`, consuming it.
    ///
    /// Returns whether a waiter was satisfied. A send into an exchange
    /// whose caller already resolved (timeout racing delivery) is a no-op.
    pub fn deliver(&self, event: &str, payload: Value) -> bool {
        let waiter = self.waiters.lock().remove(event);
        match waiter {
            Some(w) => {
                let _ = w.tx.send(Ok(payload));
                true
            }
            None => false,
        }
    }

    /// Deliver a terminal error to the earliest-registered waiter.
    ///
    /// Error frames carry no event name, so they are routed to the
    /// exchange that has been waiting longest. Returns whether any waiter
    /// was informed.
    pub fn deliver_error(&self, err: Error) -> bool {
        let mut waiters = self.waiters.lock();
        let earliest = waiters
            .iter()
            .min_by_key(|(_, w)| w.created_at)
            .map(|(event, _)| event.clone());
        match earliest {
            Some(event) => {
                if let Some(w) = waiters.remove(&event) {
                    let _ = w.tx.send(Err(err));
                }
                true
            }
            None => false,
        }
    }

    /// Number of exchanges currently waiting.
    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

/// The send-and-await dispatcher shared by every caller.
///
/// Holds the waiter registry and the handle to the current write task. The
/// supervisor swaps the write handle on reconnect; in-flight callers keep
/// their registered waiters and only notice as latency or timeout.
pub(crate) struct Correlator {
    registry: Registry,
    outbound: RwLock<Option<mpsc::Sender<OutboundFrame>>>,
    request_timeout: Duration,
}

impl Correlator {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            registry: Registry::default(),
            outbound: RwLock::new(None),
            request_timeout,
        }
    }

    /// The registry, for the router's lookups.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Install the write handle for a freshly spawned write task.
    pub fn install_writer(&self, tx: mpsc::Sender<OutboundFrame>) {
        *self.outbound.write() = Some(tx);
    }

    /// Drop the write handle; subsequent sends fail with `NotConnected`.
    pub fn clear_writer(&self) {
        *self.outbound.write() = None;
    }

    /// Queue one serialized frame and wait for the write result.
    pub async fn send_raw(&self, text: String) -> Result<()> {
        let tx = self
            .outbound
            .read()
            .clone()
            .ok_or(Error::NotConnected)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(OutboundFrame { text, ack: ack_tx })
            .await
            .map_err(|_| Error::NotConnected)?;
        ack_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// Send `{event: payload}` and await the response event.
    ///
    /// Races four terminal conditions; exactly one resolves the exchange:
    /// a matching payload, a delivered error, the per-exchange timeout
    /// (tagged with the sent event name), or the caller's cancellation —
    /// which takes priority whenever it is simultaneously ready.
    pub async fn send_and_await(
        &self,
        cancel: &CancellationToken,
        event: &str,
        response_event: &str,
        payload: &Value,
    ) -> Result<Value> {
        let text = frame::encode_envelope(event, payload)?;
        let mut rx = self.registry.register(response_event)?;
        // releases the registration on every exit path, including the
        // caller dropping this future mid-race
        let _guard = RegistrationGuard {
            registry: &self.registry,
            event: response_event,
        };
        debug!(event, response_event, "exchange registered");

        self.send_raw(text).await?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = &mut rx => res.unwrap_or(Err(Error::NotConnected)),
            () = tokio::time::sleep(self.request_timeout) => Err(Error::RequestTimeout {
                event: event.to_string(),
            }),
        }
    }
}

struct RegistrationGuard<'a> {
    registry: &'a Registry,
    event: &'a str,
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn deliver_resolves_the_registered_waiter() {
        let registry = Registry::default();
        let mut rx = registry.register("newImages").unwrap();
        assert!(registry.deliver("newImages", json!({"ok": true})));
        let value = rx.try_recv().unwrap().unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn second_registration_for_same_event_is_rejected() {
        let registry = Registry::default();
        let _rx = registry.register("newImages").unwrap();
        assert_matches!(
            registry.register("newImages"),
            Err(Error::ExchangeInFlight { ref event }) if event == "newImages"
        );
    }

    #[test]
    fn deliver_without_waiter_reports_unmatched() {
        let registry = Registry::default();
        assert!(!registry.deliver("newImages", json!({})));
    }

    #[test]
    fn duplicate_delivery_is_a_noop() {
        let registry = Registry::default();
        let _rx = registry.register("newImages").unwrap();
        assert!(registry.deliver("newImages", json!(1)));
        assert!(!registry.deliver("newImages", json!(2)));
    }

    #[test]
    fn error_goes_to_the_earliest_waiter() {
        let registry = Registry::default();
        let mut first = registry.register("newImages").unwrap();
        let mut second = registry.register("newUpscaleGan").unwrap();

        assert!(registry.deliver_error(Error::remote(Some(19), "bad key")));

        assert_matches!(first.try_recv().unwrap(), Err(Error::Remote { .. }));
        // the later exchange is untouched
        assert!(second.try_recv().is_err());
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn error_with_no_waiters_reports_unmatched() {
        let registry = Registry::default();
        assert!(!registry.deliver_error(Error::remote(None, "")));
    }

    #[tokio::test]
    async fn send_fails_when_no_writer_installed() {
        let correlator = Correlator::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let err = correlator
            .send_and_await(&cancel, "newTask", "newImages", &json!({"a": 1}))
            .await
            .unwrap_err();
        assert_matches!(err, Error::NotConnected);
        // the failed send released its registration
        assert_eq!(correlator.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn null_payload_is_rejected_before_registration() {
        let correlator = Correlator::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let err = correlator
            .send_and_await(&cancel, "newTask", "newImages", &Value::Null)
            .await
            .unwrap_err();
        assert_matches!(err, Error::EmptyPayload);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_tagged_with_the_sent_event() {
        let correlator = Correlator::new(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::channel(8);
        correlator.install_writer(tx);
        // ack every write so the exchange reaches the race
        tokio::spawn(async move {
            while let Some(OutboundFrame { ack, .. }) = rx.recv().await {
                let _ = ack.send(Ok(()));
            }
        });

        let cancel = CancellationToken::new();
        let err = correlator
            .send_and_await(&cancel, "newTask", "newImages", &json!({"a": 1}))
            .await
            .unwrap_err();
        assert_matches!(err, Error::RequestTimeout { ref event } if event == "newTask");
        assert_eq!(correlator.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_exchange_future_releases_the_registration() {
        let correlator = std::sync::Arc::new(Correlator::new(Duration::from_secs(30)));
        let (tx, mut out_rx) = mpsc::channel(8);
        correlator.install_writer(tx);

        let cancel = CancellationToken::new();
        let task = {
            let correlator = correlator.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                correlator
                    .send_and_await(&cancel, "newTask", "newImages", &json!({"a": 1}))
                    .await
            })
        };
        let OutboundFrame { ack, .. } = out_rx.recv().await.unwrap();
        let _ = ack.send(Ok(()));
        tokio::task::yield_now().await;
        assert_eq!(correlator.registry().pending_count(), 1);

        // abort stands in for a caller dropping the future mid-race
        task.abort();
        let _ = task.await;
        assert_eq!(correlator.registry().pending_count(), 0);

        // the event name is immediately reusable
        let _rx = correlator.registry().register("newImages").unwrap();
    }

    #[tokio::test]
    async fn cancellation_wins_a_simultaneous_response() {
        let correlator = std::sync::Arc::new(Correlator::new(Duration::from_secs(30)));
        let (tx, mut out_rx) = mpsc::channel(8);
        correlator.install_writer(tx);

        let cancel = CancellationToken::new();
        let task = {
            let correlator = correlator.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                correlator
                    .send_and_await(&cancel, "newTask", "newImages", &json!({"a": 1}))
                    .await
            })
        };

        // wait until the request is on the wire, so the waiter is parked
        let OutboundFrame { ack, .. } = out_rx.recv().await.unwrap();
        let _ = ack.send(Ok(()));

        // make both terminal conditions ready before the waiter runs again
        cancel.cancel();
        correlator.registry().deliver("newImages", json!({"late": true}));

        let result = task.await.unwrap();
        assert_matches!(result, Err(Error::Cancelled));
    }
}
