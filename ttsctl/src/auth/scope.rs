//! Per-request read cache.
//!
//! A [`RequestScope`] lives exactly as long as one inbound request. It carries
//! the authenticated account and memoises the balance read, so several steps of
//! one request share a single lookup while separate requests never share state.
//! The memoised balance is only advisory: debits re-check the balance inside the
//! datastore at the instant of debit.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;

use crate::{
    AppState,
    auth::current_user::CurrentAccount,
    errors::{Error, Result},
    store::Datastore,
    types::{AccountId, Credits},
};

pub struct RequestScope {
    account: CurrentAccount,
    store: Arc<dyn Datastore>,
    balance: Mutex<Option<Credits>>,
}

impl RequestScope {
    pub fn new(account: CurrentAccount, store: Arc<dyn Datastore>) -> Self {
        Self {
            account,
            store,
            balance: Mutex::new(None),
        }
    }

    pub fn account(&self) -> &CurrentAccount {
        &self.account
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id
    }

    /// Balance as of the first read in this request.
    pub async fn balance(&self) -> Result<Credits> {
        if let Some(balance) = *self.balance.lock() {
            return Ok(balance);
        }

        let balance = self.store.get_balance(self.account.id).await.map_err(Error::from)?;
        *self.balance.lock() = Some(balance);
        Ok(balance)
    }

    /// Replace the memoised balance with one the datastore just returned.
    pub fn record_balance(&self, balance: Credits) {
        *self.balance.lock() = Some(balance);
    }
}

impl FromRequestParts<AppState> for RequestScope {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let account = CurrentAccount::from_request_parts(parts, state).await?;
        Ok(Self::new(account, state.store.clone()))
    }
}
