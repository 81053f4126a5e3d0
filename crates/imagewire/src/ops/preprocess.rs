//! ControlNet guide-image preprocessing.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;
use crate::types::task_type;

/// Canny threshold defaults.
const DEFAULT_LOW_THRESHOLD_CANNY: i64 = 100;
const DEFAULT_HIGH_THRESHOLD_CANNY: i64 = 200;

/// A guide-image preprocessing task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessGuideRequest {
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// Preprocessor name, one of [`crate::types::processor`].
    pub pre_processor_type: String,
    /// The guide image to preprocess. Required.
    #[serde(rename = "guideImageUUID")]
    pub guide_image_uuid: String,
    /// Task type. Defaults to ControlNet preprocessing.
    pub task_type: i64,
    /// Output width.
    pub width: i64,
    /// Output height.
    pub height: i64,
    /// Canny low threshold. Defaults to 100.
    pub low_threshold_canny: i64,
    /// Canny high threshold. Defaults to 200.
    pub high_threshold_canny: i64,
}

/// Preprocessing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessGuideResponse {
    /// Source locator of the preprocessed image.
    pub new_image_src: String,
    /// UUID of the preprocessed image.
    #[serde(rename = "newImageUUID")]
    pub new_image_uuid: String,
    /// UUID of the input image.
    #[serde(rename = "initImageUUID")]
    pub init_image_uuid: String,
    /// NSFW flag; the service may send `null`.
    #[serde(rename = "nNsfwContent")]
    pub nsfw_content: Option<bool>,
    /// The task this result belongs to.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
}

fn apply_defaults(request: &mut PreprocessGuideRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
    if request.task_type == 0 {
        request.task_type = task_type::CONTROL_NET_PREPROCESS_IMAGE;
    }
    if request.low_threshold_canny == 0 {
        request.low_threshold_canny = DEFAULT_LOW_THRESHOLD_CANNY;
    }
    if request.high_threshold_canny == 0 {
        request.high_threshold_canny = DEFAULT_HIGH_THRESHOLD_CANNY;
    }
}

fn validate(request: &PreprocessGuideRequest) -> Result<()> {
    if request.guide_image_uuid.is_empty() {
        return Err(Error::FieldRequired {
            field: "guideImageUUID",
        });
    }
    Ok(())
}

impl Client {
    /// Preprocess a guide image for ControlNet-guided generation.
    pub async fn preprocess_guide(
        &self,
        cancel: &CancellationToken,
        mut request: PreprocessGuideRequest,
    ) -> Result<PreprocessGuideResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;
        let value = self
            .send_and_await(
                cancel,
                events::NEW_PREPROCESS_CONTROL_NET,
                events::NEW_PREPROCESS_CONTROL_NET,
                &payload,
            )
            .await?;
        from_payload(value)
    }
}
