use crate::{
    db::{
        errors::Result,
        models::projects::{ProjectCreateDBRequest, ProjectDBResponse},
    },
    types::{AccountId, ProjectId},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, FromRow)]
struct GenerationProject {
    pub id: ProjectId,
    pub account_id: AccountId,
    pub text: String,
    pub language: String,
    pub voice_s3_key: String,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    pub s3_key: String,
    pub credits_charged: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GenerationProject> for ProjectDBResponse {
    fn from(p: GenerationProject) -> Self {
        Self {
            id: p.id,
            account_id: p.account_id,
            text: p.text,
            language: p.language,
            voice_s3_key: p.voice_s3_key,
            exaggeration: p.exaggeration,
            cfg_weight: p.cfg_weight,
            s3_key: p.s3_key,
            credits_charged: p.credits_charged,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

const PROJECT_COLUMNS: &str =
    "id, account_id, text, language, voice_s3_key, exaggeration, cfg_weight, s3_key, credits_charged, created_at, updated_at";

pub struct Projects<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Projects<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        let project = sqlx::query_as::<_, GenerationProject>(&format!(
            r#"
            INSERT INTO generation_projects
                (id, account_id, text, language, voice_s3_key, exaggeration, cfg_weight, s3_key, credits_charged)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(request.id)
        .bind(request.account_id)
        .bind(&request.text)
        .bind(&request.language)
        .bind(&request.voice_s3_key)
        .bind(request.exaggeration)
        .bind(request.cfg_weight)
        .bind(&request.s3_key)
        .bind(request.credits_charged)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(project.into())
    }

    /// All projects belonging to the account, newest first
    pub async fn list_for_account(&mut self, account_id: AccountId) -> Result<Vec<ProjectDBResponse>> {
        let projects = sqlx::query_as::<_, GenerationProject>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM generation_projects WHERE account_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(account_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(projects.into_iter().map(Into::into).collect())
    }

    /// Delete a project if it belongs to the account, returning the deleted row.
    ///
    /// A project owned by someone else is indistinguishable from a missing one.
    pub async fn delete_owned(&mut self, account_id: AccountId, id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        let project = sqlx::query_as::<_, GenerationProject>(&format!(
            "DELETE FROM generation_projects WHERE id = $1 AND account_id = $2 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(project.map(Into::into))
    }
}
