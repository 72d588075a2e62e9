//! HTTP handler for payment provider webhooks.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};

use crate::{AppState, api::models::payments::WebhookAck, billing::WebhookError};

/// Receive a payment provider event
///
/// The raw body is needed for signature verification, so it is taken as a string.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    tag = "payments",
    summary = "Payment webhook",
    description = "Standard Webhooks signed delivery from the payment provider. `order.paid` credits the account \
                   named by the customer's external id with the purchased tier. Redeliveries are acknowledged without effect.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload or missing account reference"),
        (status = 401, description = "Invalid signature or stale timestamp"),
        (status = 404, description = "Unknown account"),
        (status = 501, description = "Webhooks not configured"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Result<Json<WebhookAck>, WebhookError> {
    let outcome = state.billing().handle(&headers, &body).await?;
    Ok(Json(WebhookAck { received: true, outcome }))
}
