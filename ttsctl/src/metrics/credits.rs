//! Credit ledger metrics.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, register_int_counter};

/// Credits spent on successful generations
static CREDITS_DEBITED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tts_credits_debited_total", "Total credits debited for speech generation")
        .expect("Failed to register tts_credits_debited_total metric")
});

/// Credits added by payment webhooks
static CREDITS_PURCHASED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tts_credits_purchased_total", "Total credits added through payments")
        .expect("Failed to register tts_credits_purchased_total metric")
});

pub fn record_credits_debited(amount: i64) {
    CREDITS_DEBITED.inc_by(amount.max(0) as u64);
}

pub fn record_credits_purchased(amount: i64) {
    CREDITS_PURCHASED.inc_by(amount.max(0) as u64);
}
