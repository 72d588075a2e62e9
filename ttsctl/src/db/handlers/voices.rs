use crate::{
    db::{
        errors::Result,
        models::voices::{VoiceCreateDBRequest, VoiceDBResponse},
    },
    types::{AccountId, VoiceId},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, FromRow)]
struct UploadedVoice {
    pub id: VoiceId,
    pub account_id: AccountId,
    pub name: String,
    pub s3_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadedVoice> for VoiceDBResponse {
    fn from(v: UploadedVoice) -> Self {
        Self {
            id: v.id,
            account_id: v.account_id,
            name: v.name,
            s3_key: v.s3_key,
            content_type: v.content_type,
            size_bytes: v.size_bytes,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

pub struct Voices<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Voices<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &VoiceCreateDBRequest) -> Result<VoiceDBResponse> {
        let voice = sqlx::query_as::<_, UploadedVoice>(
            r#"
            INSERT INTO uploaded_voices (id, account_id, name, s3_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, name, s3_key, content_type, size_bytes, created_at, updated_at
            "#,
        )
        .bind(request.id)
        .bind(request.account_id)
        .bind(&request.name)
        .bind(&request.s3_key)
        .bind(&request.content_type)
        .bind(request.size_bytes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(voice.into())
    }

    pub async fn list_for_account(&mut self, account_id: AccountId) -> Result<Vec<VoiceDBResponse>> {
        let voices = sqlx::query_as::<_, UploadedVoice>(
            r#"
            SELECT id, account_id, name, s3_key, content_type, size_bytes, created_at, updated_at
            FROM uploaded_voices
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(voices.into_iter().map(Into::into).collect())
    }

    pub async fn account_owns_key(&mut self, account_id: AccountId, s3_key: &str) -> Result<bool> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM uploaded_voices WHERE account_id = $1 AND s3_key = $2)",
        )
        .bind(account_id)
        .bind(s3_key)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(owned)
    }
}
