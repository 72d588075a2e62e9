//! API response models for payment webhooks.

use serde::Serialize;
use utoipa::ToSchema;

use crate::billing::WebhookOutcome;

/// Acknowledgement of a valid delivery
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: WebhookOutcome,
}
