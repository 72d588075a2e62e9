//! Generation and webhook outcome counters.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, register_int_counter_vec};

static GENERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("tts_generations_total", "Speech generation requests by outcome", &["outcome"])
        .expect("Failed to register tts_generations_total metric")
});

static WEBHOOK_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("tts_webhook_events_total", "Payment webhook deliveries by outcome", &["outcome"])
        .expect("Failed to register tts_webhook_events_total metric")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success,
    Invalid,
    InsufficientCredits,
    ProviderError,
    InternalError,
}

impl GenerationOutcome {
    fn as_str(self) -> &'static str {
        match self {
            GenerationOutcome::Success => "success",
            GenerationOutcome::Invalid => "invalid",
            GenerationOutcome::InsufficientCredits => "insufficient_credits",
            GenerationOutcome::ProviderError => "provider_error",
            GenerationOutcome::InternalError => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcomeLabel {
    Applied,
    Duplicate,
    Ignored,
    UnknownProduct,
    Rejected,
    Failed,
}

impl WebhookOutcomeLabel {
    fn as_str(self) -> &'static str {
        match self {
            WebhookOutcomeLabel::Applied => "applied",
            WebhookOutcomeLabel::Duplicate => "duplicate",
            WebhookOutcomeLabel::Ignored => "ignored",
            WebhookOutcomeLabel::UnknownProduct => "unknown_product",
            WebhookOutcomeLabel::Rejected => "rejected",
            WebhookOutcomeLabel::Failed => "failed",
        }
    }
}

pub fn record_generation(outcome: GenerationOutcome) {
    GENERATIONS.with_label_values(&[outcome.as_str()]).inc();
}

pub fn record_webhook_event(outcome: WebhookOutcomeLabel) {
    WEBHOOK_EVENTS.with_label_values(&[outcome.as_str()]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        record_generation(GenerationOutcome::Success);
        record_webhook_event(WebhookOutcomeLabel::Duplicate);

        let rendered = crate::metrics::render_default_registry();
        assert!(rendered.contains("tts_generations_total"));
        assert!(rendered.contains("outcome=\"duplicate\""));
    }
}
