//! Database models for accounts.

use crate::types::{AccountId, Credits};
use chrono::{DateTime, Utc};

/// Database request for creating an account on first sign-in
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub id: AccountId,
    pub email: Option<String>,
    /// Credits granted at signup, recorded as a `signup_grant` ledger entry
    pub initial_credits: Credits,
}

/// Database response for an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub email: Option<String>,
    pub credits: Credits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
