//! API request/response models for speech generation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    generation::{GenerationInput, GenerationResult},
    types::{Credits, ProjectId},
};

/// Speech generation request.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error naming it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SpeechCreate {
    /// Text to synthesize
    #[schema(example = "Hello from the other side.")]
    pub text: Option<String>,
    /// Key of a default voice or of a voice sample the caller uploaded
    #[schema(example = "samples/voices/en-female.wav")]
    pub voice_s3_key: Option<String>,
    /// Two-letter language code
    #[schema(example = "en")]
    pub language: Option<String>,
    /// Expressiveness, conventionally in [0, 1] (default: 0.5)
    pub exaggeration: Option<f64>,
    /// Pacing / guidance weight, conventionally in [0, 1] (default: 0.5)
    pub cfg_weight: Option<f64>,
}

impl From<SpeechCreate> for GenerationInput {
    fn from(req: SpeechCreate) -> Self {
        Self {
            text: req.text,
            voice_s3_key: req.voice_s3_key,
            language: req.language,
            exaggeration: req.exaggeration,
            cfg_weight: req.cfg_weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpeechResponse {
    pub success: bool,
    #[schema(value_type = String, format = "uuid")]
    pub project_id: ProjectId,
    /// Artifact key of the generated audio
    pub s3_key: String,
    /// URL the audio can be fetched from
    pub audio_url: String,
    pub credits_charged: Credits,
    /// Balance after this generation
    pub balance: Credits,
}

impl From<GenerationResult> for SpeechResponse {
    fn from(result: GenerationResult) -> Self {
        Self {
            success: true,
            project_id: result.project.id,
            s3_key: result.project.s3_key,
            audio_url: result.audio_url,
            credits_charged: result.project.credits_charged,
            balance: result.balance_after,
        }
    }
}
