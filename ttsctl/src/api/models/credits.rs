//! API response models for the credit ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::credits::{CreditTransactionDBResponse, CreditTransactionType},
    types::{AccountId, Credits},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    pub credits: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditTransactionResponse {
    pub id: i64,
    pub transaction_type: CreditTransactionType,
    /// Signed change: positive for grants and purchases, negative for usage
    pub amount: Credits,
    pub balance_after: Credits,
    pub source_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransactionDBResponse> for CreditTransactionResponse {
    fn from(tx: CreditTransactionDBResponse) -> Self {
        Self {
            id: tx.id,
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            balance_after: tx.balance_after,
            source_id: tx.source_id,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    /// Newest first
    pub data: Vec<CreditTransactionResponse>,
    pub skip: i64,
    pub limit: i64,
}
