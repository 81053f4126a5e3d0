//! Image generation with paginated result accumulation.
//!
//! The service streams generation results across several `newImages`
//! messages, each carrying whatever finished since the last one. The
//! operation keeps re-sending the same task and merging batches by image
//! UUID until the requested count has accumulated or the overall poll
//! timeout fires — in which case the partial accumulator is returned,
//! flagged `timed_out`.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;
use crate::types::{ControlNet, Image, Lora, size, task_type};

/// Delay between accumulation iterations.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// Default number of images when the caller leaves it unset.
const DEFAULT_NUMBER_RESULTS: u32 = 4;

/// An image generation task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateImagesRequest {
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// Initiator image for image-to-image tasks.
    #[serde(rename = "imageInitiatorUUID", skip_serializing_if = "String::is_empty")]
    pub image_initiator_uuid: String,
    /// The prompt. Required.
    pub prompt_text: String,
    /// How many images to accumulate. Defaults to 4.
    pub number_results: u32,
    /// Model id. Defaults to AbsoluteReality.
    pub model_id: String,
    /// Output size id. Defaults to 512×512.
    pub size_id: i64,
    /// Task type. Inferred from the request shape when unset.
    pub task_type: i64,
    /// Prompt language id. Sent as `null` when unset.
    pub prompt_language_id: Option<String>,
    /// Result offset.
    pub offset: i64,
    /// LoRAs to apply.
    pub lora: Vec<Lora>,
    /// ControlNet guides to apply.
    pub control_net: Vec<ControlNet>,
}

/// Accumulated generation results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateImagesResponse {
    /// The accumulated images, in order of first appearance.
    pub images: Vec<Image>,
    /// Total results the service reported available.
    pub total_available_results: i64,
    /// Whether the overall poll timeout fired before the requested count
    /// accumulated. The images gathered so far are still returned.
    pub timed_out: bool,
}

/// Infer the task type from which inputs are present.
///
/// Returns 0 when the combination matches nothing, which callers treat as
/// "fall back to the default task type".
#[must_use]
pub fn infer_task_type(
    prompt_text: &str,
    control_net: &[ControlNet],
    image_mask_uuid: &str,
    image_initiator_uuid: &str,
) -> i64 {
    let has_prompt = !prompt_text.is_empty();
    let has_control_net = !control_net.is_empty();
    let has_mask = !image_mask_uuid.is_empty();
    let has_initiator = !image_initiator_uuid.is_empty();

    match (has_prompt, has_control_net, has_mask, has_initiator) {
        (true, false, false, false) => task_type::TEXT_TO_IMAGE,
        (true, false, false, true) => task_type::IMAGE_TO_IMAGE,
        (true, false, true, true) => task_type::INPAINTING,
        (true, true, false, false) => task_type::CONTROL_NET_TEXT_TO_IMAGE,
        (true, true, false, true) => task_type::CONTROL_NET_IMAGE_TO_IMAGE,
        (true, true, true, true) => task_type::CONTROL_NET_PREPROCESS_IMAGE,
        _ => 0,
    }
}

fn apply_defaults(request: &mut GenerateImagesRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
    if request.task_type == 0 {
        request.task_type = infer_task_type(
            &request.prompt_text,
            &request.control_net,
            "",
            &request.image_initiator_uuid,
        );
    }
    if request.task_type == 0 {
        request.task_type = task_type::TEXT_TO_IMAGE;
    }
    if request.size_id == 0 {
        request.size_id = size::SQUARE_512;
    }
    if request.number_results == 0 {
        request.number_results = DEFAULT_NUMBER_RESULTS;
    }
    if request.model_id.is_empty() {
        request.model_id = crate::types::model::ABSOLUTEREALITY.to_string();
    }
}

fn validate(request: &GenerateImagesRequest) -> Result<()> {
    if request.prompt_text.is_empty() {
        return Err(Error::FieldRequired {
            field: "promptText",
        });
    }
    Ok(())
}

/// Merge one batch into the accumulator, keyed by image UUID.
///
/// An already-seen UUID overwrites only the mutable fields in place,
/// preserving list order; a new UUID appends in arrival order.
fn merge_images(batch: Vec<Image>, accumulated: &mut Vec<Image>) {
    for image in batch {
        if let Some(existing) = accumulated
            .iter_mut()
            .find(|e| e.image_uuid == image.image_uuid)
        {
            existing.image_alt_text = image.image_alt_text;
            existing.nsfw_content = image.nsfw_content;
            existing.image_src = image.image_src;
        } else {
            accumulated.push(image);
        }
    }
}

impl Client {
    /// Generate images, accumulating paginated results until the requested
    /// count is reached or the overall poll timeout fires.
    pub async fn generate_images(
        &self,
        cancel: &CancellationToken,
        mut request: GenerateImagesRequest,
    ) -> Result<GenerateImagesResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;

        let mut response = GenerateImagesResponse::default();
        let mut accumulated_count: usize = 0;
        let wanted = request.number_results as usize;

        let overall = tokio::time::sleep(self.config.poll_timeout);
        tokio::pin!(overall);

        loop {
            let exchange =
                self.send_and_await(cancel, events::NEW_TASK, events::NEW_IMAGES, &payload);
            let value = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = &mut overall => {
                    response.timed_out = true;
                    return Ok(response);
                }
                result = exchange => result?,
            };

            let batch: GenerateImagesResponse = from_payload(value)?;
            response.total_available_results += batch.total_available_results;
            accumulated_count += batch.images.len();
            merge_images(batch.images, &mut response.images);
            debug!(accumulated_count, wanted, "generation batch merged");

            if accumulated_count >= wanted {
                return Ok(response);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = &mut overall => {
                    response.timed_out = true;
                    return Ok(response);
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}
