//! Image upload with base64 and signature validation.
//!
//! The service only accepts PNG, JPEG, and WEBP. Validation happens
//! client-side before anything is sent: strip an optional
//! `data:image/...;base64,` prefix, decode, and sniff the magic bytes.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;

/// An upload task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadImageRequest {
    /// Base64 image data, raw or as a `data:image/...` URI. Required.
    #[serde(rename = "imageBase64")]
    pub image_base64: String,
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
}

/// Upload results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadImageResponse {
    /// Source locator of the stored image.
    #[serde(rename = "newImageSrc")]
    pub new_image_src: String,
    /// UUID of the stored image, usable as an initiator or guide.
    #[serde(rename = "newImageUUID")]
    pub new_image_uuid: String,
    /// The task this result belongs to.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
}

/// Image formats the service accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

/// Sniff the image format from decoded bytes.
fn sniff_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(Error::ImageHeader {
            reason: "insufficient image data",
        });
    }
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Ok(ImageFormat::Png);
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(ImageFormat::Jpeg);
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Ok(ImageFormat::Webp);
    }
    Err(Error::ImageUnsupported)
}

/// Validate upload data: optional data-URI prefix, base64, known signature.
fn validate_base64_image(value: &str) -> Result<ImageFormat> {
    let encoded = if value.starts_with("data:image") {
        let comma = value.find(',').ok_or(Error::ImageWrongSchema)?;
        &value[comma + 1..]
    } else {
        value
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| Error::ImageNotBase64)?;

    sniff_format(&decoded)
}

fn apply_defaults(request: &mut UploadImageRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
}

fn validate(request: &UploadImageRequest) -> Result<()> {
    if request.image_base64.is_empty() {
        return Err(Error::FieldRequired {
            field: "imageBase64",
        });
    }
    let _ = validate_base64_image(&request.image_base64)?;
    Ok(())
}

impl Client {
    /// Upload an image for later use as an initiator or guide.
    pub async fn upload_image(
        &self,
        cancel: &CancellationToken,
        mut request: UploadImageRequest,
    ) -> Result<UploadImageResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;
        let value = self
            .send_and_await(
                cancel,
                events::NEW_IMAGE_UPLOAD,
                events::NEW_UPLOADED_IMAGE_UUID,
                &payload,
            )
            .await?;
        from_payload(value)
    }
}
