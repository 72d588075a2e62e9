use crate::{
    AppState,
    db::models::accounts::AccountCreateDBRequest,
    errors::{Error, Result},
    types::{AccountId, abbrev_uuid},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{info, instrument, trace};

/// The account behind an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAccount {
    pub id: AccountId,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(session) = state.sessions.current_session(&parts.headers).await? else {
            trace!("No authentication credentials found in request");
            return Err(Error::Unauthenticated { message: None });
        };

        // Stands in for the identity provider's signup callback
        if state.config.auth.auto_create_accounts {
            let request = AccountCreateDBRequest {
                id: session.account_id,
                email: session.email.clone(),
                initial_credits: state.config.credits.initial_credits,
            };
            let (_, created) = state.store.ensure_account(&request).await?;
            if created {
                info!(
                    account_id = %abbrev_uuid(&session.account_id),
                    initial_credits = request.initial_credits,
                    "Created account on first sign-in"
                );
            }
        }

        Ok(CurrentAccount {
            id: session.account_id,
            email: session.email,
        })
    }
}
