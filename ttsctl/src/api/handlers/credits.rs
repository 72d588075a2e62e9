//! HTTP handlers for the caller's credit ledger.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};

use crate::{
    AppState,
    api::models::{
        credits::{BalanceResponse, CreditTransactionResponse, TransactionListResponse},
        pagination::Pagination,
    },
    auth::{current_user::CurrentAccount, scope::RequestScope},
    db::handlers::credits::CreditTransactionFilter,
    errors::Result,
};

/// Get the caller's balance
#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    summary = "Get balance",
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_balance(scope: RequestScope) -> Result<Json<BalanceResponse>> {
    Ok(Json(BalanceResponse {
        account_id: scope.account_id(),
        credits: scope.balance().await?,
    }))
}

/// List the caller's ledger entries
#[utoipa::path(
    get,
    path = "/credits/transactions",
    tag = "credits",
    summary = "List credit transactions",
    description = "Signup grants, purchases and usage of the calling account, newest first.",
    params(Pagination),
    responses(
        (status = 200, description = "Ledger entries", body = TransactionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    account: CurrentAccount,
    pagination: std::result::Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<TransactionListResponse>> {
    let Query(pagination) = pagination?;
    let (skip, limit) = pagination.params();
    let transactions = state
        .store
        .list_transactions(&CreditTransactionFilter::new(account.id, skip, limit))
        .await?;

    Ok(Json(TransactionListResponse {
        data: transactions.into_iter().map(CreditTransactionResponse::from).collect(),
        skip,
        limit,
    }))
}
