//! Durable state behind the orchestrator and the webhook handler.
//!
//! [`Datastore`] is the seam between request handling and persistence. Each
//! operation is atomic on its own: the ledger invariants (no negative balance,
//! no debit without a project, at most one credit per payment event) hold for
//! any interleaving of concurrent calls across processes.
//!
//! - [`postgres::PostgresStore`]: production implementation over the `db` repositories
//! - [`in_memory::InMemoryStore`]: single-process implementation for tests and local runs

use async_trait::async_trait;

use crate::db::errors::Result;
use crate::db::handlers::credits::{CreditTransactionFilter, GrantResult};
use crate::db::models::{
    accounts::{AccountCreateDBRequest, AccountDBResponse},
    credits::{CreditGrantDBRequest, CreditTransactionDBResponse},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    voices::{VoiceCreateDBRequest, VoiceDBResponse},
};
use crate::types::{AccountId, Credits, ProjectId};

pub mod in_memory;
pub mod postgres;


pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Outcome of [`Datastore::debit_and_create_project`]
#[derive(Debug, Clone, PartialEq)]
pub enum DebitOutcome {
    /// Credits were debited and the project recorded in one step
    Charged { project: ProjectDBResponse, balance_after: Credits },
    /// The balance at the instant of debit did not cover the cost; nothing was written
    Insufficient { available: Credits },
}

/// Source id of the usage ledger entry written for a project
pub fn usage_source_id(project_id: ProjectId) -> String {
    format!("project:{project_id}")
}

/// Source id of the signup grant ledger entry
pub fn signup_source_id(account_id: AccountId) -> String {
    format!("signup:{account_id}")
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Create the account with its signup grant if it does not exist.
    ///
    /// Returns the account and whether this call created it.
    async fn ensure_account(&self, request: &AccountCreateDBRequest) -> Result<(AccountDBResponse, bool)>;

    /// Current balance; zero for an unknown account.
    async fn get_balance(&self, account_id: AccountId) -> Result<Credits>;

    /// Debit `request.credits_charged` and record the project, or do neither.
    ///
    /// The sufficiency check happens at the instant of debit, so a stale balance
    /// read earlier in the request can never cause an overdraft.
    async fn debit_and_create_project(&self, request: &ProjectCreateDBRequest) -> Result<DebitOutcome>;

    /// Add purchased credits exactly once per `request.source_id`.
    async fn credit(&self, request: &CreditGrantDBRequest) -> Result<GrantResult>;

    /// Projects owned by the account, newest first.
    async fn list_projects(&self, account_id: AccountId) -> Result<Vec<ProjectDBResponse>>;

    /// Delete the project if the account owns it. `None` for both missing and foreign projects.
    async fn delete_project(&self, account_id: AccountId, project_id: ProjectId) -> Result<Option<ProjectDBResponse>>;

    async fn create_voice(&self, request: &VoiceCreateDBRequest) -> Result<VoiceDBResponse>;

    /// Voice samples uploaded by the account, newest first.
    async fn list_voices(&self, account_id: AccountId) -> Result<Vec<VoiceDBResponse>>;

    async fn account_owns_voice(&self, account_id: AccountId, s3_key: &str) -> Result<bool>;

    /// Ledger entries for the account, newest first.
    async fn list_transactions(&self, filter: &CreditTransactionFilter) -> Result<Vec<CreditTransactionDBResponse>>;
}
