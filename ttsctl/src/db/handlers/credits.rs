use crate::{
    db::{
        errors::Result,
        models::credits::{CreditGrantDBRequest, CreditTransactionDBResponse, CreditTransactionType},
    },
    types::{AccountId, Credits as CreditAmount},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

/// Filter for listing credit transactions
#[derive(Debug, Clone)]
pub struct CreditTransactionFilter {
    pub account_id: AccountId,
    pub skip: i64,
    pub limit: i64,
}

impl CreditTransactionFilter {
    pub fn new(account_id: AccountId, skip: i64, limit: i64) -> Self {
        Self { account_id, skip, limit }
    }
}

// Database entity model for credit transaction
#[derive(Debug, Clone, FromRow)]
struct CreditTransaction {
    pub id: i64,
    pub account_id: AccountId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_after: i64,
    pub source_id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for CreditTransactionDBResponse {
    fn from(tx: CreditTransaction) -> Self {
        Self {
            id: tx.id,
            account_id: tx.account_id,
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            balance_after: tx.balance_after,
            source_id: tx.source_id,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

/// Result of a conditional debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitResult {
    /// The balance covered the cost; this is the balance after the debit
    Debited(CreditAmount),
    /// The balance did not cover the cost; nothing changed
    Insufficient(CreditAmount),
}

/// Result of crediting an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResult {
    Applied(CreditAmount),
    /// A ledger entry with the same source id already exists
    Duplicate,
    UnknownAccount,
}

pub struct Credits<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Credits<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Current balance. An account that does not exist has a balance of zero.
    pub async fn get_balance(&mut self, account_id: AccountId) -> Result<CreditAmount> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT credits FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(balance.unwrap_or(0))
    }

    /// Subtract `cost` if and only if the balance covers it.
    ///
    /// The check and the subtraction are a single conditional `UPDATE`, so two
    /// concurrent debits can never both pass against the same credits.
    pub async fn try_debit(&mut self, account_id: AccountId, cost: CreditAmount) -> Result<DebitResult> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE accounts
            SET credits = credits - $2, updated_at = NOW()
            WHERE id = $1 AND credits >= $2
            RETURNING credits
            "#,
        )
        .bind(account_id)
        .bind(cost)
        .fetch_optional(&mut *self.db)
        .await?;

        match remaining {
            Some(balance_after) => Ok(DebitResult::Debited(balance_after)),
            None => Ok(DebitResult::Insufficient(self.get_balance(account_id).await?)),
        }
    }

    /// Credit an account exactly once per `source_id`.
    ///
    /// Must run inside a transaction: the account row is locked, the ledger
    /// entry is inserted and only then is the balance incremented. A duplicate
    /// source id leaves the balance untouched.
    pub async fn grant(&mut self, request: &CreditGrantDBRequest) -> Result<GrantResult> {
        let current = sqlx::query_scalar::<_, i64>("SELECT credits FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(request.account_id)
            .fetch_optional(&mut *self.db)
            .await?;
        let Some(current) = current else {
            return Ok(GrantResult::UnknownAccount);
        };

        let balance_after = current + request.amount;
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO credit_transactions (account_id, transaction_type, amount, balance_after, source_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(request.account_id)
        .bind(CreditTransactionType::Purchase)
        .bind(request.amount)
        .bind(balance_after)
        .bind(&request.source_id)
        .bind(&request.description)
        .fetch_optional(&mut *self.db)
        .await?;

        if inserted.is_none() {
            return Ok(GrantResult::Duplicate);
        }

        sqlx::query("UPDATE accounts SET credits = $2, updated_at = NOW() WHERE id = $1")
            .bind(request.account_id)
            .bind(balance_after)
            .execute(&mut *self.db)
            .await?;

        Ok(GrantResult::Applied(balance_after))
    }

    /// Append a ledger entry whose balance change has already been applied to `accounts`.
    pub async fn record(
        &mut self,
        account_id: AccountId,
        transaction_type: CreditTransactionType,
        amount: CreditAmount,
        balance_after: CreditAmount,
        source_id: &str,
        description: Option<&str>,
    ) -> Result<CreditTransactionDBResponse> {
        let transaction = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (account_id, transaction_type, amount, balance_after, source_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, transaction_type, amount, balance_after, source_id, description, created_at
            "#,
        )
        .bind(account_id)
        .bind(transaction_type)
        .bind(amount)
        .bind(balance_after)
        .bind(source_id)
        .bind(description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(transaction.into())
    }

    /// List transactions for an account, newest first
    pub async fn list_transactions(&mut self, filter: &CreditTransactionFilter) -> Result<Vec<CreditTransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, account_id, transaction_type, amount, balance_after, source_id, description, created_at
            FROM credit_transactions
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(filter.account_id)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions.into_iter().map(Into::into).collect())
    }
}
