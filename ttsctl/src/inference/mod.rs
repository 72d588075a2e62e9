//! Remote speech-synthesis provider.
//!
//! The provider receives text plus a reference-voice key, renders the audio on
//! a GPU worker, writes it to the artifact bucket itself and answers with the
//! key it wrote. This crate never sees the audio bytes of a generation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;

pub mod http;

pub use http::HttpInferenceProvider;

/// Body of one synthesis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_s3_key: String,
    pub language: String,
    /// Expressiveness
    pub exaggeration: f64,
    /// Pacing / guidance weight
    pub cfg_weight: f64,
}

/// Successful provider answer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynthesisOutput {
    /// Key of the generated audio, e.g. `tts/<uuid>.wav`
    #[serde(rename = "s3_Key", alias = "s3_key")]
    pub s3_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to inference provider timed out")]
    Timeout,

    #[error("inference provider unreachable: {0}")]
    Transport(String),

    #[error("inference provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference provider returned an unusable payload: {0}")]
    MalformedResponse(String),
}

impl From<ProviderError> for crate::errors::Error {
    fn from(err: ProviderError) -> Self {
        crate::errors::Error::Provider { message: err.to_string() }
    }
}

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, ProviderError>;
}

/// Create the configured inference provider.
pub fn create_inference_provider(config: &InferenceConfig) -> anyhow::Result<Arc<dyn InferenceProvider>> {
    Ok(Arc::new(HttpInferenceProvider::new(config)?))
}
