//! Wire data types and service constants shared by the domain operations.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Service constants
// ─────────────────────────────────────────────────────────────────────────────

/// Task types understood by the service. The wire carries these as plain
/// numbers, so they are numeric constants rather than an enum.
pub mod task_type {
    /// Generate from a text prompt only.
    pub const TEXT_TO_IMAGE: i64 = 1;
    /// Generate from a prompt plus an initiator image.
    pub const IMAGE_TO_IMAGE: i64 = 2;
    /// Generate inside a masked region of an initiator image.
    pub const INPAINTING: i64 = 3;
    /// Caption an image.
    pub const IMAGE_TO_TEXT: i64 = 4;
    /// Enhance a prompt.
    pub const PROMPT_ENHANCER: i64 = 5;
    /// GAN upscale.
    pub const IMAGE_UPSCALE: i64 = 6;
    /// Upload an image.
    pub const IMAGE_UPLOAD: i64 = 7;
    /// Remove an image background.
    pub const REMOVE_BACKGROUND: i64 = 8;
    /// ControlNet-guided generation from a prompt.
    pub const CONTROL_NET_TEXT_TO_IMAGE: i64 = 9;
    /// ControlNet-guided generation from a prompt plus initiator image.
    pub const CONTROL_NET_IMAGE_TO_IMAGE: i64 = 10;
    /// Preprocess a ControlNet guide image.
    pub const CONTROL_NET_PREPROCESS_IMAGE: i64 = 11;
}

/// Model ids accepted by the service.
pub mod model {
    /// SDXL base.
    pub const SDXL: i64 = 4;
    /// Rev Animated.
    pub const REV_ANIMATED: i64 = 13;
    /// AbsoluteReality.
    pub const ABSOLUTEREALITY: i64 = 18;
    /// CyberRealistic.
    pub const CYBERREALISTIC: i64 = 19;
    /// DreamShaper.
    pub const DREAMSHAPER: i64 = 20;
    /// GhostMix baked-VAE.
    pub const GHOSTMIX_BAKEDVAE: i64 = 22;
    /// Samaritan 3D Cartoon.
    pub const SAMARITAN_3D_CARTOON: i64 = 25;
}

/// Output size ids accepted by the service.
pub mod size {
    /// 512×512.
    pub const SQUARE_512: i64 = 1;
    /// Portrait 2:3.
    pub const PORTRAIT_2TO3: i64 = 2;
    /// Portrait 1:2.
    pub const PORTRAIT_1TO2: i64 = 3;
    /// Landscape 2:3.
    pub const LANDSCAPE_2TO3: i64 = 4;
    /// Landscape 2:1.
    pub const LANDSCAPE_2TO1: i64 = 5;
    /// Landscape 4:3.
    pub const LANDSCAPE_4TO3: i64 = 6;
    /// Landscape 16:9.
    pub const LANDSCAPE_16TO9: i64 = 7;
    /// Portrait 9:16.
    pub const PORTRAIT_9TO16: i64 = 8;
    /// Portrait 3:4.
    pub const PORTRAIT_3TO4: i64 = 9;
    /// 1024×1024 (SDXL).
    pub const SQUARE_1024_SDXL: i64 = 11;
    /// Landscape 16:9 (SDXL).
    pub const LANDSCAPE_16TO9_SDXL: i64 = 16;
    /// Portrait 9:16 (SDXL).
    pub const PORTRAIT_9TO16_SDXL: i64 = 17;
    /// Portrait 2:3 (SDXL).
    pub const PORTRAIT_2TO3_SDXL: i64 = 20;
    /// Landscape 3:2 (SDXL).
    pub const LANDSCAPE_3TO2_SDXL: i64 = 21;
}

/// ControlNet preprocessor names.
pub mod processor {
    /// Canny edge detection.
    pub const CANNY: &str = "canny";
    /// Depth estimation.
    pub const DEPTH: &str = "depth";
    /// Mobile line segment detection.
    pub const MLSD: &str = "mlsd";
    /// Surface normal estimation.
    pub const NORMALBAE: &str = "normalbae";
    /// Human pose estimation.
    pub const OPENPOSE: &str = "openpose";
    /// Tiling.
    pub const TILE: &str = "tile";
    /// Semantic segmentation.
    pub const SEG: &str = "seg";
    /// Line art extraction.
    pub const LINEART: &str = "lineart";
    /// Anime-style line art extraction.
    pub const LINEART_ANIME: &str = "lineart_anime";
    /// Content shuffle.
    pub const SHUFFLE: &str = "shuffle";
    /// Scribble.
    pub const SCRIBBLE: &str = "scribble";
    /// Soft edge detection.
    pub const SOFTEDGE: &str = "softedge";
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire structs
// ─────────────────────────────────────────────────────────────────────────────

/// One generated or stored image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    /// Source locator for the image content.
    #[serde(rename = "imageSrc")]
    pub image_src: String,
    /// Stable identifier; the merge key for accumulated results.
    #[serde(rename = "imageUUID")]
    pub image_uuid: String,
    /// NSFW content flag.
    #[serde(rename = "bNSFWContent")]
    pub nsfw_content: bool,
    /// Display text.
    #[serde(rename = "imageAltText")]
    pub image_alt_text: String,
    /// The task this image belongs to.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
}

/// One generated text result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedText {
    /// The task this text belongs to.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// The text content.
    pub text: String,
}

/// A LoRA applied during generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lora {
    /// LoRA model id.
    #[serde(rename = "modelId")]
    pub model_id: String,
    /// Blend weight.
    pub weight: f64,
}

/// A ControlNet guide applied during generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlNet {
    /// Preprocessor name, one of [`processor`].
    pub preprocessor: String,
    /// Guidance weight.
    pub weight: f64,
    /// First diffusion step the guide applies to.
    pub start_step: i64,
    /// Last diffusion step the guide applies to.
    pub end_step: i64,
    /// UUID of the uploaded guide image.
    #[serde(rename = "guideImageUUID")]
    pub guide_image_uuid: String,
    /// Control mode.
    pub control_mode: String,
}
