//! HMAC-SHA256 verification for Standard Webhooks deliveries.
//!
//! Standard Webhooks uses the following signature scheme:
//! - Signature is computed over: `{msg_id}.{timestamp}.{payload}`
//! - The signature is base64-encoded HMAC-SHA256
//! - Headers include: `webhook-id`, `webhook-timestamp`, `webhook-signature`
//! - `webhook-signature` may carry several space-separated `v1,<sig>` entries
//!   while a secret is being rotated
//!
//! See: <https://www.standardwebhooks.com/>

use std::time::Duration;

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{PaymentWebhookVerifier, VerifiedDelivery, WebhookError};

type HmacSha256 = Hmac<Sha256>;

/// Prefix for webhook secrets
pub const SECRET_PREFIX: &str = "whsec_";

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// Secret bytes from a `whsec_` prefixed base64 secret, or the raw bytes of any other string.
///
/// Returns `None` for a `whsec_` secret that is not valid base64.
pub fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    match secret.strip_prefix(SECRET_PREFIX) {
        Some(encoded) => BASE64_STANDARD.decode(encoded).ok(),
        None => Some(secret.as_bytes().to_vec()),
    }
}

/// Sign a payload according to Standard Webhooks.
///
/// Returns the signature in format `v1,{base64-hmac-sha256}`.
pub fn sign_payload(msg_id: &str, timestamp: i64, payload: &str, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(format!("{msg_id}.{timestamp}.{payload}").as_bytes());
    format!("v1,{}", BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Whether any `v1` entry of a `webhook-signature` header matches.
pub fn verify_signature(msg_id: &str, timestamp: i64, payload: &str, signatures: &str, secret: &[u8]) -> bool {
    let expected = sign_payload(msg_id, timestamp, payload, secret);
    let Some(expected_value) = expected.strip_prefix("v1,") else {
        return false;
    };

    signatures
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected_value.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// [`PaymentWebhookVerifier`] for providers that sign with Standard Webhooks.
pub struct StandardWebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl StandardWebhookVerifier {
    pub fn new(secret: &str, tolerance: Duration) -> Result<Self, WebhookError> {
        let secret = decode_secret(secret).ok_or_else(|| WebhookError::Configuration("webhook secret is not valid base64".to_string()))?;
        if secret.is_empty() {
            return Err(WebhookError::Configuration("webhook secret is empty".to_string()));
        }
        Ok(Self { secret, tolerance })
    }

    pub fn verify_at(&self, headers: &HeaderMap, body: &str, now: DateTime<Utc>) -> Result<VerifiedDelivery, WebhookError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or(WebhookError::InvalidSignature)
        };
        let msg_id = header(HEADER_ID)?;
        let timestamp: i64 = header(HEADER_TIMESTAMP)?.trim().parse().map_err(|_| WebhookError::InvalidSignature)?;
        let signatures = header(HEADER_SIGNATURE)?;

        let skew = now.timestamp().abs_diff(timestamp);
        if skew > self.tolerance.as_secs() {
            return Err(WebhookError::StaleTimestamp);
        }

        if !verify_signature(msg_id, timestamp, body, signatures, &self.secret) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(VerifiedDelivery { id: msg_id.to_string() })
    }
}

impl PaymentWebhookVerifier for StandardWebhookVerifier {
    fn verify(&self, headers: &HeaderMap, body: &str) -> Result<VerifiedDelivery, WebhookError> {
        self.verify_at(headers, body, Utc::now())
    }
}
