//! Payment provider event payloads.
//!
//! Only the fields needed to credit an account are read. Everything else in the
//! payload is ignored, so provider-side schema additions do not break parsing.

use serde::Deserialize;

use super::WebhookError;

/// Event type that credits an account
pub const ORDER_PAID: &str = "order.paid";

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    product_id: Option<String>,
    product: Option<RawProduct>,
    customer: Option<RawCustomer>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCustomer {
    external_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    account_id: Option<String>,
}

/// A parsed webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_type: String,
    /// Our account id as the provider knows it
    pub external_reference: Option<String>,
    pub product_id: Option<String>,
}

impl PaymentEvent {
    pub fn parse(body: &str) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_str(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

        let external_reference = raw
            .data
            .customer
            .and_then(|c| c.external_id)
            .or_else(|| raw.data.metadata.and_then(|m| m.account_id))
            .filter(|s| !s.trim().is_empty());

        let product_id = raw
            .data
            .product_id
            .or_else(|| raw.data.product.and_then(|p| p.id))
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            event_type: raw.event_type,
            external_reference,
            product_id,
        })
    }

    pub fn is_order_paid(&self) -> bool {
        self.event_type == ORDER_PAID
    }
}
