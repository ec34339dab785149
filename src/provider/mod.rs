/// Generation provider boundary
///
/// The studio never talks to a model API directly; it consumes this
/// capability trait, so the real Gemini adapter and the test mocks are
/// interchangeable. The orchestrator does not retry and does not interpret
/// failures beyond picking a user-facing message.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::images::ImageHandle;

/// The three synthesis operations the studio needs.
#[async_trait]
pub trait TryOnProvider: Send + Sync {
    /// Turn a user portrait into a studio model photo.
    async fn synthesize_base_model(&self, portrait: ImageHandle)
        -> Result<ImageHandle, ProviderError>;

    /// Fit a garment onto the current model image.
    async fn synthesize_try_on(
        &self,
        model_image: ImageHandle,
        garment_image: ImageHandle,
    ) -> Result<ImageHandle, ProviderError>;

    /// Re-pose an existing composite according to a catalog instruction.
    async fn synthesize_pose_variant(
        &self,
        source_image: ImageHandle,
        pose_instruction: String,
    ) -> Result<ImageHandle, ProviderError>;
}

/// Why a generation request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("rate limited by the image service")]
    RateLimited,
    #[error("generation quota exhausted")]
    QuotaExhausted,
    #[error("missing or invalid API credentials")]
    InvalidConfiguration,
    #[error("the safety filter blocked this image")]
    ContentBlocked,
    #[error("the model returned no image output")]
    NoOutputProduced,
    #[error("{0}")]
    Unknown(String),
}

/// Raw detail longer than this is noise in an error panel; fall back to the
/// short context line instead.
const MAX_RAW_DETAIL: usize = 150;

impl ProviderError {
    /// Translate a failure into actionable guidance for the error panel.
    ///
    /// `context` names the attempt that failed ("Style generation failed")
    /// and is the fallback when the raw detail would overwhelm the UI.
    pub fn guidance(&self, context: &str) -> String {
        match self {
            Self::RateLimited | Self::QuotaExhausted => {
                "Quota limit reached: the image service is out of capacity for now.\n\n\
                 1. Wait 60 seconds and retry.\n\
                 2. Or visit https://ai.google.dev/gemini-api/docs/billing to set up \
                 a pay-as-you-go project."
                    .to_string()
            }
            Self::InvalidConfiguration => {
                "Configuration error: no API key detected.\n\n\
                 Set the GEMINI_API_KEY environment variable, or add \"api_key\" to the \
                 settings file, then restart the studio."
                    .to_string()
            }
            Self::ContentBlocked => {
                "Safety block: the AI's safety filter rejected this image. \
                 Try a simpler, more professional photo."
                    .to_string()
            }
            Self::NoOutputProduced => {
                "The AI returned no image. The source may be too complex; \
                 try a clearer or simpler image."
                    .to_string()
            }
            Self::Unknown(detail) => {
                if detail.is_empty() || detail.len() > MAX_RAW_DETAIL {
                    context.to_string()
                } else {
                    detail.clone()
                }
            }
        }
    }
}
