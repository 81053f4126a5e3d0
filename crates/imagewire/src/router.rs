//! Inbound fan-out: classify each frame and satisfy at most one waiter.
//!
//! The read task calls [`route`] for every text frame. Classification
//! outcomes never terminate the read loop — a malformed or unexpected
//! frame is at worst fatal to one exchange.

use tracing::{debug, warn};

use crate::correlator::Registry;
use crate::events;
use crate::frame::InboundFrame;
use crate::supervisor::Liveness;

/// Route one raw text frame to whichever exchange it belongs to.
pub(crate) fn route(registry: &Registry, liveness: &Liveness, text: &str) {
    match InboundFrame::parse(text) {
        Err(err) => {
            // malformed frame: fails only the exchange being resolved
            if !registry.deliver_error(err) {
                warn!("discarding malformed frame with no exchange active");
            }
        }
        Ok(InboundFrame::Error(error_frame)) => {
            let err = error_frame.into_error();
            if !registry.deliver_error(err) {
                warn!("discarding error frame with no exchange active");
            }
        }
        Ok(InboundFrame::HeartbeatReply) => {
            liveness.mark_alive();
        }
        Ok(InboundFrame::Events(entries)) => {
            for (name, payload) in entries {
                if registry.deliver(&name, payload) {
                    // at most one exchange per inbound message
                    break;
                } else if events::is_known_inbound(&name) {
                    debug!(event = %name, "skipping event with no active waiter");
                } else {
                    warn!(event = %name, "unknown event");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn matching_event_is_delivered() {
        let registry = Registry::default();
        let liveness = Liveness::default();
        let mut rx = registry.register("newImages").unwrap();

        route(&registry, &liveness, r#"{"newImages": {"images": []}}"#);

        let value = rx.try_recv().unwrap().unwrap();
        assert_eq!(value["images"], json!([]));
    }

    #[test]
    fn only_the_first_matching_key_is_delivered() {
        let registry = Registry::default();
        let liveness = Liveness::default();
        let mut images = registry.register("newImages").unwrap();
        let mut upscale = registry.register("newUpscaleGan").unwrap();

        route(
            &registry,
            &liveness,
            r#"{"newImages": 1, "newUpscaleGan": 2}"#,
        );

        assert!(images.try_recv().unwrap().is_ok());
        // second key of the same message is left for a later message
        assert!(upscale.try_recv().is_err());
    }

    #[test]
    fn pong_resets_liveness_and_delivers_nothing() {
        let registry = Registry::default();
        let liveness = Liveness::default();
        let mut rx = registry.register("newImages").unwrap();
        liveness.expect_reply();

        route(&registry, &liveness, r#"{"pong": true}"#);

        assert!(liveness.check_alive());
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn error_frame_fails_the_active_exchange() {
        let registry = Registry::default();
        let liveness = Liveness::default();
        let mut rx = registry.register("newImages").unwrap();

        route(
            &registry,
            &liveness,
            r#"{"error": true, "errorId": 19, "errorMessage": "Invalid API key"}"#,
        );

        assert_matches!(rx.try_recv().unwrap(), Err(Error::Remote { .. }));
    }

    #[test]
    fn malformed_frame_fails_the_active_exchange() {
        let registry = Registry::default();
        let liveness = Liveness::default();
        let mut rx = registry.register("newImages").unwrap();

        route(&registry, &liveness, "}{");

        assert_matches!(rx.try_recv().unwrap(), Err(Error::Decode { .. }));
    }

    #[test]
    fn unmatched_frames_do_not_panic_or_deliver() {
        let registry = Registry::default();
        let liveness = Liveness::default();

        route(&registry, &liveness, r#"{"newImages": 1}"#);
        route(&registry, &liveness, r#"{"somethingNew": 1}"#);
        route(&registry, &liveness, "}{");
        route(
            &registry,
            &liveness,
            r#"{"error": true, "errorId": 3, "errorMessage": "x"}"#,
        );

        assert_eq!(registry.pending_count(), 0);
    }
}
