//! Prompt enhancement.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{fresh_task_uuid, from_payload, to_payload};
use crate::client::Client;
use crate::errors::{Error, Result};
use crate::events;
use crate::types::GeneratedText;

/// A prompt enhancement task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancePromptRequest {
    /// Task identifier. Filled with a fresh UUID when unset.
    #[serde(rename = "taskUUID")]
    pub task_uuid: String,
    /// The prompt to enhance. The service expects it under `prompt`.
    #[serde(rename = "prompt")]
    pub prompt_text: String,
    /// Maximum length of each enhanced prompt, 1–380.
    pub prompt_max_length: i64,
    /// How many variants to produce, 1–5. Defaults to 3.
    pub prompt_versions: i64,
    /// Prompt language id. Defaults to 1.
    pub prompt_language_id: i64,
}

/// Enhanced prompt variants.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnhancePromptResponse {
    /// The enhanced prompts.
    pub texts: Vec<GeneratedText>,
}

fn apply_defaults(request: &mut EnhancePromptRequest) {
    if request.task_uuid.is_empty() {
        request.task_uuid = fresh_task_uuid();
    }
    if request.prompt_language_id == 0 {
        request.prompt_language_id = 1;
    }
    if request.prompt_versions == 0 {
        request.prompt_versions = 3;
    }
}

fn validate(request: &EnhancePromptRequest) -> Result<()> {
    if !(1..=380).contains(&request.prompt_max_length) {
        return Err(Error::FieldOutOfRange {
            field: "promptMaxLength",
            range: "1-380",
        });
    }
    if !(1..=5).contains(&request.prompt_versions) {
        return Err(Error::FieldOutOfRange {
            field: "promptVersions",
            range: "1-5",
        });
    }
    Ok(())
}

impl Client {
    /// Enhance a prompt into one or more richer variants.
    pub async fn enhance_prompt(
        &self,
        cancel: &CancellationToken,
        mut request: EnhancePromptRequest,
    ) -> Result<EnhancePromptResponse> {
        apply_defaults(&mut request);
        validate(&request)?;
        let payload = to_payload(&request)?;
        let value = self
            .send_and_await(
                cancel,
                events::NEW_PROMPT_ENHANCE,
                events::NEW_PROMPT_ENHANCER,
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

    fn valid_request() -> EnhancePromptRequest {
        EnhancePromptRequest {
            prompt_text: "a cat".into(),
            prompt_max_length: 64,
            ..EnhancePromptRequest::default()
        }
    }

    #[test]
    fn defaults_fill_versions_and_language() {
        let mut request = valid_request();
        apply_defaults(&mut request);
        assert_eq!(request.prompt_versions, 3);
        assert_eq!(request.prompt_language_id, 1);
        assert!(!request.task_uuid.is_empty());
    }

    #[test]
    fn max_length_must_be_in_range() {
        let mut request = valid_request();
        apply_defaults(&mut request);

        request.prompt_max_length = 0;
        assert_matches!(
            validate(&request),
            Err(Error::FieldOutOfRange { field: "promptMaxLength", .. })
        );

        request.prompt_max_length = 381;
        assert_matches!(
            validate(&request),
            Err(Error::FieldOutOfRange { field: "promptMaxLength", .. })
        );
    }

    #[test]
    fn versions_must_be_in_range() {
        let mut request = valid_request();
        apply_defaults(&mut request);
        request.prompt_versions = 6;
        assert_matches!(
            validate(&request),
            Err(Error::FieldOutOfRange { field: "promptVersions", .. })
        );
    }

    #[test]
    fn prompt_serializes_under_the_short_name() {
        let mut request = valid_request();
        apply_defaults(&mut request);
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["prompt"], "a cat");
        assert_eq!(v["promptMaxLength"], 64);
        assert_eq!(v["promptVersions"], 3);
    }
}
