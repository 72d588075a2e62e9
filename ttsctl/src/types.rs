//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`AccountId`]: account identifier, owned by the identity provider
//! - [`ProjectId`]: one persisted text-to-speech generation
//! - [`VoiceId`]: one uploaded reference-voice sample
//!
//! Credits are whole units and stored as `BIGINT`, hence [`Credits`] is an `i64`.

use uuid::Uuid;

pub type AccountId = Uuid;
pub type ProjectId = Uuid;
pub type VoiceId = Uuid;

/// Whole credit units. Never negative once stored against an account.
pub type Credits = i64;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
