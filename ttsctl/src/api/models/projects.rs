//! API response models for generation projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::projects::ProjectDBResponse,
    types::{Credits, ProjectId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProjectId,
    pub text: String,
    pub language: String,
    pub voice_s3_key: String,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    pub s3_key: String,
    /// Freshly minted on every listing
    pub audio_url: String,
    pub credits_charged: Credits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectResponse {
    pub fn new(project: ProjectDBResponse, audio_url: String) -> Self {
        Self {
            id: project.id,
            text: project.text,
            language: project.language,
            voice_s3_key: project.voice_s3_key,
            exaggeration: project.exaggeration,
            cfg_weight: project.cfg_weight,
            s3_key: project.s3_key,
            audio_url,
            credits_charged: project.credits_charged,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// The caller's projects, newest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectListResponse {
    pub data: Vec<ProjectResponse>,
}
