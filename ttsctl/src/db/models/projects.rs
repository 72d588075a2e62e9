//! Database models for generation projects.

use crate::types::{AccountId, Credits, ProjectId};
use chrono::{DateTime, Utc};

/// Database request for recording one successful synthesis
#[derive(Debug, Clone)]
pub struct ProjectCreateDBRequest {
    pub id: ProjectId,
    pub account_id: AccountId,
    pub text: String,
    pub language: String,
    pub voice_s3_key: String,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    /// Key of the synthesized audio in the artifact store
    pub s3_key: String,
    /// Credits debited for this generation
    pub credits_charged: Credits,
}

/// Database response for a generation project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDBResponse {
    pub id: ProjectId,
    pub account_id: AccountId,
    pub text: String,
    pub language: String,
    pub voice_s3_key: String,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    pub s3_key: String,
    pub credits_charged: Credits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
