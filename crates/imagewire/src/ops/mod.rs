//! Domain operations: thin typed wrappers over the correlator.
//!
//! Every operation follows the same shape — apply explicit defaults
//! (filling only unset fields), validate, send its request event, await
//! its response event, unmarshal into a typed response. The generation
//! operation additionally repeats the exchange to accumulate paginated
//! results.

mod caption;
mod enhance;
mod generate;
mod preprocess;
mod upload;
mod upscale;

pub use caption::{CaptionImageRequest, CaptionImageResponse};
pub use enhance::{EnhancePromptRequest, EnhancePromptResponse};
pub use generate::{GenerateImagesRequest, GenerateImagesResponse, infer_task_type};
pub use preprocess::{PreprocessGuideRequest, PreprocessGuideResponse};
pub use upload::{UploadImageRequest, UploadImageResponse};
pub use upscale::{UpscaleImageRequest, UpscaleImageResponse};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{Error, Result};

/// Serialize a request struct into an exchange payload.
pub(crate) fn to_payload<T: Serialize>(request: &T) -> Result<Value> {
    serde_json::to_value(request).map_err(|e| Error::Encode {
        reason: e.to_string(),
    })
}

/// Unmarshal a matched response payload into its typed shape.
pub(crate) fn from_payload<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode {
        reason: e.to_string(),
    })
}

/// A fresh task identifier.
pub(crate) fn fresh_task_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
