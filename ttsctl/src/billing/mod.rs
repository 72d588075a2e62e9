//! Payment webhooks: turn an authenticated "order paid" event into a ledger credit.
//!
//! A delivery goes through a single transition, `received -> validated -> applied`:
//!
//! 1. The signature is verified by a [`PaymentWebhookVerifier`] before the body is parsed
//! 2. The event names the paying account and the purchased product
//! 3. The product maps to a fixed credit amount and is credited once per delivery id
//!
//! Providers deliver at least once, so the delivery id is the ledger entry's
//! `source_id` and a redelivery applies nothing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::PaymentsConfig,
    db::{
        errors::DbError,
        handlers::credits::GrantResult,
        models::credits::CreditGrantDBRequest,
    },
    metrics::{self, WebhookOutcomeLabel},
    store::Datastore,
    types::{Credits, abbrev_uuid},
};

pub mod events;
pub mod signing;

pub use events::PaymentEvent;
pub use signing::StandardWebhookVerifier;

/// A delivery whose signature checked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDelivery {
    /// Provider-assigned delivery id, stable across retries
    pub id: String,
}

/// Authenticates inbound webhook deliveries.
pub trait PaymentWebhookVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap, body: &str) -> Result<VerifiedDelivery, WebhookError>;
}

/// Build the verifier for the configured secret, if any.
pub fn create_webhook_verifier(config: &PaymentsConfig) -> Result<Option<Arc<dyn PaymentWebhookVerifier>>, WebhookError> {
    match config.webhook_secret.as_deref() {
        Some(secret) => Ok(Some(Arc::new(StandardWebhookVerifier::new(secret, config.signature_tolerance)?))),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Payment webhooks are not configured")]
    NotConfigured,

    #[error("Invalid webhook configuration: {0}")]
    Configuration(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook timestamp outside the accepted window")]
    StaleTimestamp,

    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    #[error("Webhook event carries no account reference")]
    MissingExternalReference,

    #[error("Webhook event references unknown account {0}")]
    UnknownAccount(String),

    #[error("Failed to record webhook credit: {0}")]
    Storage(#[from] DbError),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            WebhookError::InvalidSignature | WebhookError::StaleTimestamp => StatusCode::UNAUTHORIZED,
            WebhookError::Malformed(_) | WebhookError::MissingExternalReference => StatusCode::BAD_REQUEST,
            WebhookError::UnknownAccount(_) => StatusCode::NOT_FOUND,
            WebhookError::Configuration(_) | WebhookError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn metric_label(&self) -> WebhookOutcomeLabel {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::StaleTimestamp
            | WebhookError::Malformed(_)
            | WebhookError::MissingExternalReference => WebhookOutcomeLabel::Rejected,
            WebhookError::NotConfigured
            | WebhookError::Configuration(_)
            | WebhookError::UnknownAccount(_)
            | WebhookError::Storage(_) => WebhookOutcomeLabel::Failed,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Payment webhook failed: {:#}", self);
        } else {
            warn!("Payment webhook rejected: {}", self);
        }

        // Storage details stay in the logs
        let message = match &self {
            WebhookError::Storage(_) | WebhookError::Configuration(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// What a valid delivery did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Credits were added
    Applied,
    /// This delivery id was already applied
    Duplicate,
    /// Not an event that credits anything
    Ignored,
    /// Recorded with zero credits because the product id has no tier
    UnknownProduct,
}

impl WebhookOutcome {
    fn metric_label(self) -> WebhookOutcomeLabel {
        match self {
            WebhookOutcome::Applied => WebhookOutcomeLabel::Applied,
            WebhookOutcome::Duplicate => WebhookOutcomeLabel::Duplicate,
            WebhookOutcome::Ignored => WebhookOutcomeLabel::Ignored,
            WebhookOutcome::UnknownProduct => WebhookOutcomeLabel::UnknownProduct,
        }
    }
}

pub struct Billing {
    store: Arc<dyn Datastore>,
    verifier: Option<Arc<dyn PaymentWebhookVerifier>>,
    products: HashMap<String, Credits>,
}

impl Billing {
    pub fn new(
        store: Arc<dyn Datastore>,
        verifier: Option<Arc<dyn PaymentWebhookVerifier>>,
        products: HashMap<String, Credits>,
    ) -> Self {
        Self { store, verifier, products }
    }

    /// Verify, parse and apply one delivery.
    #[instrument(skip_all, fields(event_id = tracing::field::Empty))]
    pub async fn handle(&self, headers: &HeaderMap, body: &str) -> Result<WebhookOutcome, WebhookError> {
        let result = self.verify_and_apply(headers, body).await;
        metrics::record_webhook_event(match &result {
            Ok(outcome) => outcome.metric_label(),
            Err(e) => e.metric_label(),
        });
        result
    }

    async fn verify_and_apply(&self, headers: &HeaderMap, body: &str) -> Result<WebhookOutcome, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or(WebhookError::NotConfigured)?;
        let delivery = verifier.verify(headers, body)?;
        tracing::Span::current().record("event_id", delivery.id.as_str());

        let event = PaymentEvent::parse(body)?;
        self.apply(&delivery, &event).await
    }

    /// Credit the account named by an already verified event.
    pub async fn apply(&self, delivery: &VerifiedDelivery, event: &PaymentEvent) -> Result<WebhookOutcome, WebhookError> {
        if !event.is_order_paid() {
            debug!(event_type = %event.event_type, "Ignoring webhook event type");
            return Ok(WebhookOutcome::Ignored);
        }

        let reference = event.external_reference.as_deref().ok_or(WebhookError::MissingExternalReference)?;
        let account_id =
            Uuid::parse_str(reference).map_err(|_| WebhookError::Malformed(format!("external reference {reference:?} is not an account id")))?;

        let tier = event.product_id.as_deref().and_then(|product| self.products.get(product)).copied();
        let amount = match tier {
            Some(amount) => amount,
            None => {
                warn!(
                    product_id = event.product_id.as_deref().unwrap_or("<none>"),
                    account_id = %abbrev_uuid(&account_id),
                    "Paid order for unknown product; recording it without credits"
                );
                0
            }
        };

        let request = CreditGrantDBRequest {
            account_id,
            amount,
            source_id: delivery.id.clone(),
            description: Some(match event.product_id.as_deref() {
                Some(product) => format!("Purchase of {product}"),
                None => "Purchase of unidentified product".to_string(),
            }),
        };

        match self.store.credit(&request).await? {
            GrantResult::Applied(balance_after) => {
                info!(account_id = %abbrev_uuid(&account_id), amount, balance_after, "Applied purchase");
                if tier.is_some() {
                    metrics::record_credits_purchased(amount);
                    Ok(WebhookOutcome::Applied)
                } else {
                    Ok(WebhookOutcome::UnknownProduct)
                }
            }
            GrantResult::Duplicate => {
                info!(account_id = %abbrev_uuid(&account_id), "Webhook delivery already applied");
                Ok(WebhookOutcome::Duplicate)
            }
            GrantResult::UnknownAccount => Err(WebhookError::UnknownAccount(account_id.to_string())),
        }
    }
}
