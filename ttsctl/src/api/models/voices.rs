//! API response models for reference voices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::DefaultVoice, db::models::voices::VoiceDBResponse, types::VoiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSource {
    /// Shared voice available to every account
    Default,
    /// Sample uploaded by the caller
    Uploaded,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoiceResponse {
    /// Absent for default voices
    #[schema(value_type = Option<String>, format = "uuid")]
    pub id: Option<VoiceId>,
    pub name: String,
    /// Pass this as `voice_s3_key` when generating speech
    pub s3_key: String,
    pub audio_url: String,
    pub source: VoiceSource,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl VoiceResponse {
    pub fn default_voice(voice: &DefaultVoice, audio_url: String) -> Self {
        Self {
            id: None,
            name: voice.name.clone(),
            s3_key: voice.s3_key.clone(),
            audio_url,
            source: VoiceSource::Default,
            content_type: None,
            size_bytes: None,
            created_at: None,
        }
    }

    pub fn uploaded(voice: VoiceDBResponse, audio_url: String) -> Self {
        Self {
            id: Some(voice.id),
            name: voice.name,
            s3_key: voice.s3_key,
            audio_url,
            source: VoiceSource::Uploaded,
            content_type: Some(voice.content_type),
            size_bytes: Some(voice.size_bytes),
            created_at: Some(voice.created_at),
        }
    }
}

/// Default voices followed by the caller's uploads, newest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoiceListResponse {
    pub data: Vec<VoiceResponse>,
}
