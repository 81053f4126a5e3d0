//! Wire event names.
//!
//! Every message on the socket is keyed by one of these well-known names.
//! Outbound requests use the request names; the router matches inbound
//! top-level keys against the response names.

/// Handshake request.
pub const NEW_CONNECTION: &str = "newConnection";
/// Handshake response carrying the resumption token.
pub const NEW_CONNECTION_SESSION_UUID: &str = "newConnectionSessionUUID";

/// Image generation request.
pub const NEW_TASK: &str = "newTask";
/// Image generation results.
pub const NEW_IMAGES: &str = "newImages";

/// GAN upscale request and response (same name both ways).
pub const NEW_UPSCALE_GAN: &str = "newUpscaleGan";

/// Image upload request.
pub const NEW_IMAGE_UPLOAD: &str = "newImageUpload";
/// Image upload response.
pub const NEW_UPLOADED_IMAGE_UUID: &str = "newUploadedImageUUID";

/// Image captioning request.
pub const NEW_REVERSE_IMAGE_CLIP: &str = "newReverseImageClip";
/// Image captioning response.
pub const NEW_REVERSE_CLIP: &str = "newReverseClip";

/// Prompt enhancement request.
pub const NEW_PROMPT_ENHANCE: &str = "newPromptEnhance";
/// Prompt enhancement response.
pub const NEW_PROMPT_ENHANCER: &str = "newPromptEnhancer";

/// Guide-image preprocessing request and response (same name both ways).
pub const NEW_PREPROCESS_CONTROL_NET: &str = "newPreProcessControlNet";

/// In-band heartbeat reply marker.
pub const PONG: &str = "pong";

/// Inbound event names the router recognizes.
///
/// A top-level key outside this set is logged as an unknown event; it never
/// fails an exchange (forward compatibility with server-added events).
pub const KNOWN_INBOUND_EVENTS: &[&str] = &[
    NEW_CONNECTION_SESSION_UUID,
    NEW_IMAGES,
    NEW_UPSCALE_GAN,
    NEW_UPLOADED_IMAGE_UUID,
    NEW_REVERSE_CLIP,
    NEW_PROMPT_ENHANCER,
    NEW_PREPROCESS_CONTROL_NET,
    PONG,
];

/// Whether `name` is an inbound event this client version knows about.
#[must_use]
pub fn is_known_inbound(name: &str) -> bool {
    KNOWN_INBOUND_EVENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_events_are_known() {
        assert!(is_known_inbound(NEW_IMAGES));
        assert!(is_known_inbound(NEW_CONNECTION_SESSION_UUID));
        assert!(is_known_inbound(PONG));
    }

    #[test]
    fn request_events_are_not_inbound() {
        assert!(!is_known_inbound(NEW_TASK));
        assert!(!is_known_inbound(NEW_CONNECTION));
    }

    #[test]
    fn arbitrary_names_are_unknown() {
        assert!(!is_known_inbound("newShinyFeature"));
        assert!(!is_known_inbound(""));
    }
}
