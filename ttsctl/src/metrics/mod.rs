//! Prometheus metrics for generations, the credit ledger and billing webhooks.
//!
//! Metrics are registered in the default `prometheus` registry and rendered at
//! `/internal/metrics` next to the HTTP metrics from `axum-prometheus`.

mod credits;
mod generation;

pub use credits::{record_credits_debited, record_credits_purchased};
pub use generation::{GenerationOutcome, WebhookOutcomeLabel, record_generation, record_webhook_event};

/// Render every metric in the default registry in the text exposition format.
pub fn render_default_registry() -> String {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
