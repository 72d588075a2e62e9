//! Database models for credit ledger entries.

use crate::types::{AccountId, Credits};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Credit transaction type enum stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    /// Credits granted when the account was created
    SignupGrant,
    /// Credits bought through the payment provider
    Purchase,
    /// Credits spent on a generation
    Usage,
}

/// Database request for crediting an account
#[derive(Debug, Clone)]
pub struct CreditGrantDBRequest {
    pub account_id: AccountId,
    /// Always non-negative; zero records an anomalous event without changing the balance
    pub amount: Credits,
    /// Idempotency key, e.g. the webhook delivery id
    pub source_id: String,
    pub description: Option<String>,
}

/// Database response for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransactionDBResponse {
    pub id: i64,
    pub account_id: AccountId,
    pub transaction_type: CreditTransactionType,
    /// Signed change: positive for grants and purchases, negative for usage
    pub amount: Credits,
    pub balance_after: Credits,
    pub source_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
