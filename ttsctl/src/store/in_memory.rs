//! In-memory implementation of [`Datastore`].
//!
//! All state sits behind one mutex, so every operation is trivially atomic.
//! Suitable for tests and single-process local runs; everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{DebitOutcome, Datastore, signup_source_id, usage_source_id};
use crate::db::errors::{DbError, Result};
use crate::db::handlers::credits::{CreditTransactionFilter, GrantResult};
use crate::db::models::{
    accounts::{AccountCreateDBRequest, AccountDBResponse},
    credits::{CreditGrantDBRequest, CreditTransactionDBResponse, CreditTransactionType},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    voices::{VoiceCreateDBRequest, VoiceDBResponse},
};
use crate::types::{AccountId, Credits, ProjectId};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, AccountDBResponse>,
    // Vectors are kept in insertion order; listings iterate in reverse for newest first
    projects: Vec<ProjectDBResponse>,
    voices: Vec<VoiceDBResponse>,
    transactions: Vec<CreditTransactionDBResponse>,
}

impl State {
    fn push_transaction(
        &mut self,
        account_id: AccountId,
        transaction_type: CreditTransactionType,
        amount: Credits,
        balance_after: Credits,
        source_id: String,
        description: Option<String>,
    ) {
        let id = self.transactions.len() as i64 + 1;
        self.transactions.push(CreditTransactionDBResponse {
            id,
            account_id,
            transaction_type,
            amount,
            balance_after,
            source_id,
            description,
            created_at: Utc::now(),
        });
    }

    fn has_source_id(&self, source_id: &str) -> bool {
        self.transactions.iter().any(|t| t.source_id == source_id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for InMemoryStore {
    async fn ensure_account(&self, request: &AccountCreateDBRequest) -> Result<(AccountDBResponse, bool)> {
        let mut state = self.state.lock();
        if let Some(existing) = state.accounts.get(&request.id) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let account = AccountDBResponse {
            id: request.id,
            email: request.email.clone(),
            credits: request.initial_credits,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(account.id, account.clone());
        if request.initial_credits > 0 {
            state.push_transaction(
                account.id,
                CreditTransactionType::SignupGrant,
                request.initial_credits,
                request.initial_credits,
                signup_source_id(account.id),
                Some("Signup credits".to_string()),
            );
        }

        Ok((account, true))
    }

    async fn get_balance(&self, account_id: AccountId) -> Result<Credits> {
        Ok(self.state.lock().accounts.get(&account_id).map(|a| a.credits).unwrap_or(0))
    }

    async fn debit_and_create_project(&self, request: &ProjectCreateDBRequest) -> Result<DebitOutcome> {
        let mut state = self.state.lock();

        let Some(account) = state.accounts.get_mut(&request.account_id) else {
            return Ok(DebitOutcome::Insufficient { available: 0 });
        };
        if account.credits < request.credits_charged {
            return Ok(DebitOutcome::Insufficient {
                available: account.credits,
            });
        }

        let now = Utc::now();
        account.credits -= request.credits_charged;
        account.updated_at = now;
        let balance_after = account.credits;

        let project = ProjectDBResponse {
            id: request.id,
            account_id: request.account_id,
            text: request.text.clone(),
            language: request.language.clone(),
            voice_s3_key: request.voice_s3_key.clone(),
            exaggeration: request.exaggeration,
            cfg_weight: request.cfg_weight,
            s3_key: request.s3_key.clone(),
            credits_charged: request.credits_charged,
            created_at: now,
            updated_at: now,
        };
        state.projects.push(project.clone());
        state.push_transaction(
            request.account_id,
            CreditTransactionType::Usage,
            -request.credits_charged,
            balance_after,
            usage_source_id(project.id),
            Some("Speech generation".to_string()),
        );

        Ok(DebitOutcome::Charged { project, balance_after })
    }

    async fn credit(&self, request: &CreditGrantDBRequest) -> Result<GrantResult> {
        let mut state = self.state.lock();

        if !state.accounts.contains_key(&request.account_id) {
            return Ok(GrantResult::UnknownAccount);
        }
        if state.has_source_id(&request.source_id) {
            return Ok(GrantResult::Duplicate);
        }

        let balance_after = match state.accounts.get_mut(&request.account_id) {
            Some(account) => {
                account.credits += request.amount;
                account.updated_at = Utc::now();
                account.credits
            }
            None => return Ok(GrantResult::UnknownAccount),
        };
        state.push_transaction(
            request.account_id,
            CreditTransactionType::Purchase,
            request.amount,
            balance_after,
            request.source_id.clone(),
            request.description.clone(),
        );

        Ok(GrantResult::Applied(balance_after))
    }

    async fn list_projects(&self, account_id: AccountId) -> Result<Vec<ProjectDBResponse>> {
        let state = self.state.lock();
        Ok(state.projects.iter().rev().filter(|p| p.account_id == account_id).cloned().collect())
    }

    async fn delete_project(&self, account_id: AccountId, project_id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        let mut state = self.state.lock();
        let position = state
            .projects
            .iter()
            .position(|p| p.id == project_id && p.account_id == account_id);
        Ok(position.map(|i| state.projects.remove(i)))
    }

    async fn create_voice(&self, request: &VoiceCreateDBRequest) -> Result<VoiceDBResponse> {
        let mut state = self.state.lock();

        if !state.accounts.contains_key(&request.account_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("uploaded_voices_account_id_fkey".to_string()),
                table: Some("uploaded_voices".to_string()),
                message: format!("account {} does not exist", request.account_id),
            });
        }
        if state.voices.iter().any(|v| v.s3_key == request.s3_key) {
            return Err(DbError::UniqueViolation {
                constraint: Some("uploaded_voices_s3_key_unique".to_string()),
                table: Some("uploaded_voices".to_string()),
                message: format!("duplicate s3_key {}", request.s3_key),
            });
        }

        let now = Utc::now();
        let voice = VoiceDBResponse {
            id: request.id,
            account_id: request.account_id,
            name: request.name.clone(),
            s3_key: request.s3_key.clone(),
            content_type: request.content_type.clone(),
            size_bytes: request.size_bytes,
            created_at: now,
            updated_at: now,
        };
        state.voices.push(voice.clone());
        Ok(voice)
    }

    async fn list_voices(&self, account_id: AccountId) -> Result<Vec<VoiceDBResponse>> {
        let state = self.state.lock();
        Ok(state.voices.iter().rev().filter(|v| v.account_id == account_id).cloned().collect())
    }

    async fn account_owns_voice(&self, account_id: AccountId, s3_key: &str) -> Result<bool> {
        let state = self.state.lock();
        Ok(state.voices.iter().any(|v| v.account_id == account_id && v.s3_key == s3_key))
    }

    async fn list_transactions(&self, filter: &CreditTransactionFilter) -> Result<Vec<CreditTransactionDBResponse>> {
        let state = self.state.lock();
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.account_id == filter.account_id)
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
