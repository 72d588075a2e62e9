//! Database models for uploaded reference-voice samples.

use crate::types::{AccountId, VoiceId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct VoiceCreateDBRequest {
    pub id: VoiceId,
    pub account_id: AccountId,
    pub name: String,
    pub s3_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDBResponse {
    pub id: VoiceId,
    pub account_id: AccountId,
    pub name: String,
    pub s3_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
