//! GAN upscaling of a previously stored image.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;
use crate::types::Image;

/// An upscale task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleImageRequest {
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// The image to upscale. Required.
    #[serde(rename = "imageUUID")]
    pub image_uuid: String,
    /// Upscale factor. Required, non-zero.
    #[serde(rename = "upscaleFactor")]
    pub upscale_factor: u32,
}

/// Upscale results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpscaleImageResponse {
    /// The upscaled images.
    pub images: Vec<Image>,
}

fn apply_defaults(request: &mut UpscaleImageRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
}

fn validate(request: &UpscaleImageRequest) -> Result<()> {
    if request.image_uuid.is_empty() {
        return Err(Error::FieldRequired { field: "imageUUID" });
    }
    if request.upscale_factor == 0 {
        return Err(Error::FieldRequired {
            field: "upscaleFactor",
        });
    }
    Ok(())
}

impl Client {
    /// Upscale a stored image.
    pub async fn upscale_image(
        &self,
        cancel: &CancellationToken,
        mut request: UpscaleImageRequest,
    ) -> Result<UpscaleImageResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;
        let value = self
            .send_and_await(
                cancel,
                events::NEW_UPSCALE_GAN,
                events::NEW_UPSCALE_GAN,
                &payload,
            )
            .await?;
        from_payload(value)
    }
}
