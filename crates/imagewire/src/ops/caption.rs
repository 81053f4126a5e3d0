//! Image captioning (reverse CLIP).

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;
use crate::types::GeneratedText;

/// A captioning task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionImageRequest {
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// The image to caption. Required.
    #[serde(rename = "imageUUID")]
    pub image_uuid: String,
}

/// Caption results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptionImageResponse {
    /// The generated captions.
    pub texts: Vec<GeneratedText>,
}

fn apply_defaults(request: &mut CaptionImageRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
}

fn validate(request: &CaptionImageRequest) -> Result<()> {
    if request.image_uuid.is_empty() {
        return Err(Error::FieldRequired { field: "imageUUID" });
    }
    Ok(())
}

impl Client {
    /// Caption a stored image.
    pub async fn caption_image(
        &self,
        cancel: &CancellationToken,
        mut request: CaptionImageRequest,
    ) -> Result<CaptionImageResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;
        let value = self
            .send_and_await(
                cancel,
                events::NEW_REVERSE_IMAGE_CLIP,
                events::NEW_REVERSE_CLIP,
                &payload,
            )
            .await?;
        from_payload(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn missing_image_uuid_is_rejected() {
        assert_matches!(
            validate(&CaptionImageRequest::default()),
            Err(Error::FieldRequired { field: "imageUUID" })
        );
    }

    #[test]
    fn defaults_fill_the_task_uuid() {
        let mut request = CaptionImageRequest {
            image_uuid: "u-1".into(),
            ..CaptionImageRequest::default()
        };
        apply_defaults(&mut request);
        assert!(!request.task_uuid.is_empty());
    }
}
