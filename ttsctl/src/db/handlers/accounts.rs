use crate::{
    db::{
        errors::Result,
        models::accounts::{AccountCreateDBRequest, AccountDBResponse},
    },
    types::AccountId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, FromRow)]
struct Account {
    pub id: AccountId,
    pub email: Option<String>,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountDBResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            email: a.email,
            credits: a.credits,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert the account if it does not exist yet.
    ///
    /// Returns the account and whether this call created it. Racing first
    /// requests for the same account are resolved by `ON CONFLICT DO NOTHING`,
    /// so only one of them observes `created == true`.
    pub async fn create_if_missing(&mut self, request: &AccountCreateDBRequest) -> Result<(AccountDBResponse, bool)> {
        let inserted = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, credits)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, email, credits, created_at, updated_at
            "#,
        )
        .bind(request.id)
        .bind(&request.email)
        .bind(request.initial_credits)
        .fetch_optional(&mut *self.db)
        .await?;

        if let Some(account) = inserted {
            return Ok((account.into(), true));
        }

        let existing = sqlx::query_as::<_, Account>("SELECT id, email, credits, created_at, updated_at FROM accounts WHERE id = $1")
            .bind(request.id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok((existing.into(), false))
    }

    pub async fn get_by_id(&mut self, id: AccountId) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>("SELECT id, email, credits, created_at, updated_at FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(account.map(Into::into))
    }
}
