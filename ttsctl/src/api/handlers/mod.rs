//! HTTP request handlers for all API endpoints.
//!
//! Handlers authenticate through the [`crate::auth`] extractors, delegate to the
//! orchestrator, the billing handler or the datastore, and return
//! [`crate::errors::Error`], which renders as a `{"success": false, ...}` body.
//!
//! - [`speech`]: speech generation
//! - [`projects`]: listing and deleting generations
//! - [`voices`]: default voices and sample uploads
//! - [`credits`]: balance and ledger history
//! - [`payments`]: payment provider webhooks

pub mod credits;
pub mod payments;
pub mod projects;
pub mod speech;
pub mod voices;
