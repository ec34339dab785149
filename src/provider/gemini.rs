/// Gemini image generation adapter
///
/// Talks to the `generateContent` REST endpoint of the Gemini API with
/// inline base64 image parts, and translates every way the call can go
/// wrong into the studio's error taxonomy. Requests run on the app's tokio
/// executor; nothing here blocks the UI thread.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::images::ImageHandle;
use crate::provider::{ProviderError, TryOnProvider};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Image-capable Gemini model the studio is built against.
pub const MODEL_NAME: &str = "gemini-2.5-flash-image";

/// All studio shots are portrait-framed.
const ASPECT_RATIO: &str = "3:4";

const BASE_MODEL_PROMPT: &str = "PROFESSIONAL PERSONA TRANSFORMATION: Convert this person \
     into a high-end fashion studio portrait. 8k resolution, professional studio lighting. \
     Preserve facial features perfectly. Return ONLY the final image.";

const TRY_ON_PROMPT: &str = "EXACT CLOTH INTEGRATION: Fit the garment from the second image \
     onto the person in the first image. Preserve patterns and colors exactly. Return ONLY \
     the final high-resolution image.";

fn pose_prompt(instruction: &str) -> String {
    format!(
        "STANCE VARIATION: Update the person's pose to: \"{instruction}\". \
         Keep identity and clothes identical. Return ONLY the final image."
    )
}

/// Provider backed by the Gemini REST API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiProvider {
    /// Build the provider. A missing key is not fatal here; the first
    /// generation attempt reports it as a configuration error instead.
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to construct HTTP client");
        Self { client, api_key }
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<ImageHandle, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::InvalidConfiguration);
        };

        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: ASPECT_RATIO,
                },
            }),
        };

        let url = format!("{API_BASE}/{MODEL_NAME}:generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Unknown(err.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Unknown(err.to_string()))?;
        extract_image(body)
    }
}

#[async_trait]
impl TryOnProvider for GeminiProvider {
    async fn synthesize_base_model(
        &self,
        portrait: ImageHandle,
    ) -> Result<ImageHandle, ProviderError> {
        println!("✨ Generating studio persona...");
        self.generate(vec![Part::image(&portrait), Part::text(BASE_MODEL_PROMPT)])
            .await
    }

    async fn synthesize_try_on(
        &self,
        model_image: ImageHandle,
        garment_image: ImageHandle,
    ) -> Result<ImageHandle, ProviderError> {
        println!("👕 Generating try-on composite...");
        self.generate(vec![
            Part::image(&model_image),
            Part::image(&garment_image),
            Part::text(TRY_ON_PROMPT),
        ])
        .await
    }

    async fn synthesize_pose_variant(
        &self,
        source_image: ImageHandle,
        pose_instruction: String,
    ) -> Result<ImageHandle, ProviderError> {
        println!("💃 Generating pose variation: {pose_instruction}");
        self.generate(vec![
            Part::image(&source_image),
            Part::text(pose_prompt(&pose_instruction)),
        ])
        .await
    }
}

/// Map an HTTP-level failure onto the taxonomy.
fn classify_http_failure(status: u16, body: &str) -> ProviderError {
    match status {
        429 => {
            if body.contains("RESOURCE_EXHAUSTED") || body.contains("quota") {
                ProviderError::QuotaExhausted
            } else {
                ProviderError::RateLimited
            }
        }
        400 | 401 | 403 if body.contains("API key") || body.contains("API_KEY_INVALID") => {
            ProviderError::InvalidConfiguration
        }
        _ => {
            let detail: String = body.chars().take(200).collect();
            ProviderError::Unknown(format!("HTTP {status}: {detail}"))
        }
    }
}

/// Pull the generated image out of a successful response, or explain why
/// there is none.
fn extract_image(response: GenerateContentResponse) -> Result<ImageHandle, ProviderError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        println!("🚫 Prompt blocked: {reason}");
        return Err(ProviderError::ContentBlocked);
    }

    let candidate = response.candidates.into_iter().next();

    let inline = candidate
        .as_ref()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|part| part.inline_data.as_ref()));
    if let Some(inline) = inline {
        return ImageHandle::from_base64(&inline.data)
            .map_err(|_| ProviderError::Unknown("undecodable image payload".to_string()));
    }

    match candidate.and_then(|candidate| candidate.finish_reason) {
        Some(reason) if reason == "SAFETY" => Err(ProviderError::ContentBlocked),
        Some(reason) if reason != "STOP" => {
            Err(ProviderError::Unknown(format!("AI failed: {reason}")))
        }
        _ => Err(ProviderError::NoOutputProduced),
    }
}

// ---------- wire format ----------

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(
        rename = "inlineData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Part {
    fn image(image: &ImageHandle) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.mime().to_string(),
                data: image.to_base64(),
            }),
            text: None,
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self {
            inline_data: None,
            text: Some(text.into()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "imageConfig")]
    image_config: ImageConfig,
}

#[derive(Serialize)]
struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'static str,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::test_handle;

    #[test]
    fn blocked_prompt_maps_to_content_blocked() {
        let response = GenerateContentResponse {
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some("PROHIBITED_CONTENT".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(extract_image(response), Err(ProviderError::ContentBlocked));
    }

    #[test]
    fn inline_data_part_becomes_an_image() {
        let expected = test_handle(42);
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![
                        Part::text("here you go"),
                        Part {
                            inline_data: Some(InlineData {
                                mime_type: "image/png".to_string(),
                                data: expected.to_base64(),
                            }),
                            text: None,
                        },
                    ],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        };
        assert_eq!(extract_image(response), Ok(expected));
    }

    #[test]
    fn empty_response_means_no_output() {
        assert_eq!(
            extract_image(GenerateContentResponse::default()),
            Err(ProviderError::NoOutputProduced)
        );
    }

    #[test]
    fn safety_finish_reason_maps_to_content_blocked() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: None,
                finish_reason: Some("SAFETY".to_string()),
            }],
            prompt_feedback: None,
        };
        assert_eq!(extract_image(response), Err(ProviderError::ContentBlocked));
    }

    #[test]
    fn http_429_with_quota_detail_is_quota_exhausted() {
        assert_eq!(
            classify_http_failure(429, r#"{"status":"RESOURCE_EXHAUSTED"}"#),
            ProviderError::QuotaExhausted
        );
        assert_eq!(classify_http_failure(429, ""), ProviderError::RateLimited);
    }

    #[test]
    fn rejected_api_key_is_a_configuration_error() {
        assert_eq!(
            classify_http_failure(400, "API key not valid. API_KEY_INVALID"),
            ProviderError::InvalidConfiguration
        );
    }
}
