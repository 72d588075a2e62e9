//! Database record models matching table schemas.
//!
//! These structs are what the repositories in [`crate::db::handlers`] accept and
//! return. They are kept separate from the API models in [`crate::api::models`]
//! so storage and wire representations can evolve independently.
//!
//! - [`accounts`]: accounts and their cached credit balance
//! - [`credits`]: the append-only credit ledger
//! - [`projects`]: persisted generations
//! - [`voices`]: uploaded reference-voice samples

pub mod accounts;
pub mod credits;
pub mod projects;
pub mod voices;
