//! PostgreSQL implementation of [`Datastore`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{DebitOutcome, Datastore, signup_source_id, usage_source_id};
use crate::db::errors::Result;
use crate::db::handlers::credits::{CreditTransactionFilter, DebitResult, GrantResult};
use crate::db::handlers::{Accounts, Credits, Projects, Voices};
use crate::db::models::{
    accounts::{AccountCreateDBRequest, AccountDBResponse},
    credits::{CreditGrantDBRequest, CreditTransactionDBResponse, CreditTransactionType},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    voices::{VoiceCreateDBRequest, VoiceDBResponse},
};
use crate::types::{AccountId, Credits as CreditAmount, ProjectId, abbrev_uuid};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Datastore for PostgresStore {
    #[instrument(skip_all, fields(account_id = %abbrev_uuid(&request.id)), err)]
    async fn ensure_account(&self, request: &AccountCreateDBRequest) -> Result<(AccountDBResponse, bool)> {
        let mut tx = self.pool.begin().await?;
        let (account, created) = Accounts::new(&mut tx).create_if_missing(request).await?;

        if created && request.initial_credits > 0 {
            Credits::new(&mut tx)
                .record(
                    account.id,
                    CreditTransactionType::SignupGrant,
                    request.initial_credits,
                    account.credits,
                    &signup_source_id(account.id),
                    Some("Signup credits"),
                )
                .await?;
        }

        tx.commit().await?;
        Ok((account, created))
    }

    async fn get_balance(&self, account_id: AccountId) -> Result<CreditAmount> {
        let mut conn = self.pool.acquire().await?;
        Credits::new(&mut conn).get_balance(account_id).await
    }

    #[instrument(skip_all, fields(account_id = %abbrev_uuid(&request.account_id), cost = request.credits_charged), err)]
    async fn debit_and_create_project(&self, request: &ProjectCreateDBRequest) -> Result<DebitOutcome> {
        let mut tx = self.pool.begin().await?;

        let debit = Credits::new(&mut tx).try_debit(request.account_id, request.credits_charged).await?;
        let balance_after = match debit {
            DebitResult::Debited(balance_after) => balance_after,
            DebitResult::Insufficient(available) => {
                tx.rollback().await?;
                return Ok(DebitOutcome::Insufficient { available });
            }
        };

        let project = Projects::new(&mut tx).create(request).await?;
        Credits::new(&mut tx)
            .record(
                request.account_id,
                CreditTransactionType::Usage,
                -request.credits_charged,
                balance_after,
                &usage_source_id(project.id),
                Some("Speech generation"),
            )
            .await?;

        tx.commit().await?;
        Ok(DebitOutcome::Charged { project, balance_after })
    }

    #[instrument(skip_all, fields(account_id = %abbrev_uuid(&request.account_id), source_id = %request.source_id), err)]
    async fn credit(&self, request: &CreditGrantDBRequest) -> Result<GrantResult> {
        let mut tx = self.pool.begin().await?;
        let result = Credits::new(&mut tx).grant(request).await?;
        match result {
            GrantResult::Applied(_) => tx.commit().await?,
            GrantResult::Duplicate | GrantResult::UnknownAccount => tx.rollback().await?,
        }
        Ok(result)
    }

    async fn list_projects(&self, account_id: AccountId) -> Result<Vec<ProjectDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Projects::new(&mut conn).list_for_account(account_id).await
    }

    async fn delete_project(&self, account_id: AccountId, project_id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Projects::new(&mut conn).delete_owned(account_id, project_id).await
    }

    async fn create_voice(&self, request: &VoiceCreateDBRequest) -> Result<VoiceDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Voices::new(&mut conn).create(request).await
    }

    async fn list_voices(&self, account_id: AccountId) -> Result<Vec<VoiceDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Voices::new(&mut conn).list_for_account(account_id).await
    }

    async fn account_owns_voice(&self, account_id: AccountId, s3_key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Voices::new(&mut conn).account_owns_key(account_id, s3_key).await
    }

    async fn list_transactions(&self, filter: &CreditTransactionFilter) -> Result<Vec<CreditTransactionDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Credits::new(&mut conn).list_transactions(filter).await
    }
}
